use chrono::{DateTime, Utc};
use std::fmt;

/// Shift of the three plane bits. Bit 63 above them stays clear.
pub(crate) const PLANE_SHIFT: u8 = 60;
/// Bits shared by the time, host and sequence fields.
pub(crate) const FIELD_BITS: u8 = 60;
const MASK_PLANE: u64 = 0x7;

/// When ids started being issued: 2023-03-07T16:00:00Z.
/// Anything older than this cannot have come from a generator.
pub const DEFAULT_LIVE_SINCE_SECS: i64 = 1_678_204_800;

/// The logical partition stamped into the top bits of every id.
///
/// Only seven planes exist. Callers give them meaning freely
/// (entity type, table, tenant class...), the generator treats them opaquely.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Plane {
    #[default]
    A = 1,
    B = 2,
    C = 3,
    D = 4,
    E = 5,
    F = 6,
    G = 7,
}

impl Plane {
    pub const ALL: [Plane; 7] = [
        Plane::A,
        Plane::B,
        Plane::C,
        Plane::D,
        Plane::E,
        Plane::F,
        Plane::G,
    ];

    /// Map a raw 3-bit tag back to a plane. Zero and anything above 7 are rejected.
    pub fn from_tag(tag: u8) -> Option<Plane> {
        match tag {
            1 => Some(Plane::A),
            2 => Some(Plane::B),
            3 => Some(Plane::C),
            4 => Some(Plane::D),
            5 => Some(Plane::E),
            6 => Some(Plane::F),
            7 => Some(Plane::G),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// The plane positioned in the id, all other bits zero.
    pub fn bits(self) -> u64 {
        (self as u64) << PLANE_SHIFT
    }
}

/// Granularity of the time field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Millis,
    Seconds,
}

impl TimeUnit {
    /// Whole units between the Unix epoch and `time`. Pre-epoch instants read as 0.
    pub fn units_of(self, time: DateTime<Utc>) -> u64 {
        let units = match self {
            TimeUnit::Millis => time.timestamp_millis(),
            TimeUnit::Seconds => time.timestamp(),
        };
        units.max(0) as u64
    }

    pub fn to_datetime(self, units: u64) -> Option<DateTime<Utc>> {
        let units = i64::try_from(units).ok()?;
        match self {
            TimeUnit::Millis => DateTime::from_timestamp_millis(units),
            TimeUnit::Seconds => DateTime::from_timestamp(units, 0),
        }
    }
}

/// Which of host and sequence occupies the least significant bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldOrder {
    /// `plane | time | sequence | host`
    HostLow,
    /// `plane | time | host | sequence`
    SequenceLow,
}

/// Bit-width table describing how the four fields share a 64-bit id.
///
/// From most to least significant: one always-zero sign bit, three plane
/// bits, then `time`, and `host`/`sequence` in [`FieldOrder`]. The time,
/// host and sequence widths must add up to 60.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout {
    pub(crate) time_unit: TimeUnit,
    pub(crate) field_order: FieldOrder,
    pub(crate) bit_len_time: u8,
    pub(crate) bit_len_host: u8,
    pub(crate) bit_len_sequence: u8,
}

impl Layout {
    /// Millisecond ticks, 1024 ids per millisecond, host above sequence.
    /// The time field lasts until 2109.
    pub const MILLIS: Layout = Layout {
        time_unit: TimeUnit::Millis,
        field_order: FieldOrder::SequenceLow,
        bit_len_time: 42,
        bit_len_host: 8,
        bit_len_sequence: 10,
    };

    /// Second ticks, 262,144 ids per second, sequence above host.
    /// The time field lasts until 2514.
    pub const SECONDS: Layout = Layout {
        time_unit: TimeUnit::Seconds,
        field_order: FieldOrder::HostLow,
        bit_len_time: 34,
        bit_len_host: 8,
        bit_len_sequence: 18,
    };

    pub const fn new(
        time_unit: TimeUnit,
        field_order: FieldOrder,
        bit_len_time: u8,
        bit_len_host: u8,
        bit_len_sequence: u8,
    ) -> Self {
        Self {
            time_unit,
            field_order,
            bit_len_time,
            bit_len_host,
            bit_len_sequence,
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.bit_len_time > 0
            && self.bit_len_host > 0
            && self.bit_len_sequence > 0
            && self.bit_len_host <= 16
            && self.bit_len_sequence <= 32
            && u16::from(self.bit_len_time)
                + u16::from(self.bit_len_host)
                + u16::from(self.bit_len_sequence)
                == u16::from(FIELD_BITS)
    }

    pub fn time_unit(&self) -> TimeUnit {
        self.time_unit
    }

    pub fn field_order(&self) -> FieldOrder {
        self.field_order
    }

    pub fn bit_len_time(&self) -> u8 {
        self.bit_len_time
    }

    pub fn bit_len_host(&self) -> u8 {
        self.bit_len_host
    }

    pub fn bit_len_sequence(&self) -> u8 {
        self.bit_len_sequence
    }

    pub fn max_time(&self) -> u64 {
        mask(self.bit_len_time)
    }

    pub fn max_host(&self) -> u16 {
        mask(self.bit_len_host) as u16
    }

    pub fn max_sequence(&self) -> u32 {
        mask(self.bit_len_sequence) as u32
    }

    fn time_shift(&self) -> u8 {
        self.bit_len_host + self.bit_len_sequence
    }

    fn host_shift(&self) -> u8 {
        match self.field_order {
            FieldOrder::HostLow => 0,
            FieldOrder::SequenceLow => self.bit_len_sequence,
        }
    }

    fn sequence_shift(&self) -> u8 {
        match self.field_order {
            FieldOrder::HostLow => self.bit_len_host,
            FieldOrder::SequenceLow => 0,
        }
    }

    /// Pack the four fields into an id.
    ///
    /// Every field is masked to its width. A time past the encodable range
    /// wraps around.
    pub fn compose(&self, plane: Plane, time: u64, host: u16, sequence: u32) -> u64 {
        plane.bits()
            | (time & self.max_time()) << self.time_shift()
            | (u64::from(host) & mask(self.bit_len_host)) << self.host_shift()
            | (u64::from(sequence) & mask(self.bit_len_sequence)) << self.sequence_shift()
    }

    /// Break an id up into its parts.
    pub fn decompose(&self, id: u64) -> DecomposedId {
        let plane = if id >> 63 == 0 {
            Plane::from_tag(((id >> PLANE_SHIFT) & MASK_PLANE) as u8)
        } else {
            None
        };
        DecomposedId {
            id,
            unit: self.time_unit,
            plane,
            time: (id >> self.time_shift()) & self.max_time(),
            host: ((id >> self.host_shift()) & mask(self.bit_len_host)) as u16,
            sequence: ((id >> self.sequence_shift()) & mask(self.bit_len_sequence)) as u32,
        }
    }

    /// Whether `id` could have been issued under this layout: the plane is one
    /// of the seven legal values and the time is not before `live_since`
    /// (expressed in this layout's time unit).
    pub fn verify(&self, id: u64, live_since: u64) -> bool {
        let parts = self.decompose(id);
        parts.plane.is_some() && parts.time >= live_since
    }
}

/// The parts of an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecomposedId {
    pub id: u64,
    pub unit: TimeUnit,
    /// `None` when the tag bits are zero or the sign bit is set.
    pub plane: Option<Plane>,
    pub time: u64,
    pub host: u16,
    pub sequence: u32,
}

impl DecomposedId {
    /// The issuing instant, truncated to the time unit.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.unit.to_datetime(self.time)
    }
}

impl fmt::Display for DecomposedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x} (plane: ", self.id)?;
        match self.plane {
            Some(plane) => write!(f, "{plane:?}")?,
            None => f.write_str("invalid")?,
        }
        match self.datetime() {
            Some(time) => write!(f, ", time: {}", time.to_rfc3339())?,
            None => write!(f, ", time: {}", self.time)?,
        }
        write!(f, ", host: {}, seq: {})", self.host, self.sequence)
    }
}

pub(crate) const fn mask(bits: u8) -> u64 {
    if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 }
}
