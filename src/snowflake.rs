use crate::builder::Builder;
use crate::clock::TimeSource;
use crate::error::*;
use crate::layout::{DecomposedId, Layout, Plane};
use std::{
    fmt, hint,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::Instant,
};

/// Everything a generator needs besides its mutable state.
/// Resolved once by [`Builder`] and shared by all generators of a registry.
#[derive(Clone)]
pub(crate) struct Settings {
    pub(crate) layout: Layout,
    pub(crate) host_id: u16,
    /// Go-live marker in `layout.time_unit` units.
    pub(crate) live_since: u64,
    pub(crate) clock: Arc<dyn TimeSource>,
}

/// Internals of Snowflake.
/// This struct is not exposed to the public.
#[derive(Debug, Default)]
pub(crate) struct Internals {
    /// Time unit of the most recent id, `None` before the first one.
    pub(crate) last_time: Option<u64>,
    pub(crate) sequence: u32,
    pub(crate) poisoned: bool,
}

/// SharedSnowflake is shared between Snowflake instances.
/// This struct is not exposed to the public.
pub(crate) struct SharedSnowflake {
    pub(crate) settings: Settings,
    pub(crate) internals: Mutex<Internals>,
    pub(crate) overflows: AtomicU64,
}

/// Snowflake owns one monotonic stream of ids.
///
/// It is thread-safe and can be cloned to be used in multiple threads; every
/// clone draws from the same stream. Ids from one stream and one plane are
/// strictly increasing as plain integers.
pub struct Snowflake(pub(crate) Arc<SharedSnowflake>);

impl Snowflake {
    /// Create a new Snowflake with the default configuration.
    /// For custom configuration see [`builder`].
    ///
    /// [`builder`]: struct.Snowflake.html#method.builder
    pub fn new() -> Result<Self, Error> {
        Builder::new().finalize()
    }

    /// Create a new [`Builder`] to construct a Snowflake.
    ///
    /// [`Builder`]: struct.Builder.html
    pub fn builder<'a>() -> Builder<'a> {
        Builder::new()
    }

    pub(crate) fn from_settings(settings: Settings) -> Self {
        Self(Arc::new(SharedSnowflake {
            settings,
            internals: Mutex::new(Internals::default()),
            overflows: AtomicU64::new(0),
        }))
    }

    /// Generate the next unique id in `plane`.
    ///
    /// When the sequence of the current time unit is used up this blocks,
    /// holding the lock, until the clock reaches the next unit.
    ///
    /// If the clock is observed behind the last issued time unit, no id is
    /// produced: the call returns [`Error::ClockMovedBackwards`] and every
    /// later call returns [`Error::Poisoned`].
    pub fn next_id(&self, plane: Plane) -> Result<u64, Error> {
        let mut internals = self.0.internals.lock().map_err(|_| Error::MutexPoisoned)?;
        if internals.poisoned {
            return Err(Error::Poisoned);
        }

        let settings = &self.0.settings;
        let layout = settings.layout;
        let mut now = settings.clock.now(layout.time_unit);

        let last_time = internals.last_time;
        match last_time {
            Some(last) if now < last => return Err(self.poison(&mut internals, last, now)),
            Some(last) if now == last => {
                if internals.sequence < layout.max_sequence() {
                    internals.sequence += 1;
                } else {
                    now = self.wait_next_unit(&mut internals, last)?;
                    internals.sequence = 0;
                    internals.last_time = Some(now);
                }
            }
            _ => {
                internals.sequence = 0;
                internals.last_time = Some(now);
            }
        }

        Ok(layout.compose(plane, now, settings.host_id, internals.sequence))
    }

    /// Spin until the clock passes `last`. Only called with the lock held.
    fn wait_next_unit(&self, internals: &mut Internals, last: u64) -> Result<u64, Error> {
        let overflows = self.0.overflows.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(
            last_time = last,
            overflows,
            "sequence exhausted, waiting for the next time unit"
        );

        let started = Instant::now();
        let unit = self.0.settings.layout.time_unit;
        loop {
            let now = self.0.settings.clock.now(unit);
            if now > last {
                tracing::trace!(waited = ?started.elapsed(), "time unit advanced");
                return Ok(now);
            }
            if now < last {
                return Err(self.poison(internals, last, now));
            }
            hint::spin_loop();
            thread::yield_now();
        }
    }

    fn poison(&self, internals: &mut Internals, last: u64, now: u64) -> Error {
        internals.poisoned = true;
        tracing::error!(
            last_time = last,
            now,
            "clock moved backwards, generator poisoned"
        );
        Error::ClockMovedBackwards { last, now }
    }

    /// Whether a clock regression has permanently disabled this stream.
    pub fn is_poisoned(&self) -> bool {
        self.0
            .internals
            .lock()
            .map(|internals| internals.poisoned)
            .unwrap_or(true)
    }

    /// How many times a time unit ran out of sequence numbers.
    ///
    /// A steadily growing count means callers regularly outrun the sequence
    /// field and pay for it by waiting.
    pub fn overflow_count(&self) -> u64 {
        self.0.overflows.load(Ordering::Relaxed)
    }

    pub fn layout(&self) -> Layout {
        self.0.settings.layout
    }

    pub fn host_id(&self) -> u16 {
        self.0.settings.host_id
    }

    /// The go-live marker used by [`verify`](Self::verify), in layout time units.
    pub fn live_since(&self) -> u64 {
        self.0.settings.live_since
    }

    /// Break an id up into its parts using this generator's layout.
    pub fn decompose(&self, id: u64) -> DecomposedId {
        self.0.settings.layout.decompose(id)
    }

    /// Check an id that arrived from outside, e.g. read back from storage.
    pub fn verify(&self, id: u64) -> bool {
        self.0.settings.layout.verify(id, self.0.settings.live_since)
    }
}

/// Returns a new `Snowflake` referencing the same state as `self`.
/// This is used for concurrent use.
impl Clone for Snowflake {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl fmt::Debug for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snowflake")
            .field("layout", &self.0.settings.layout)
            .field("host_id", &self.0.settings.host_id)
            .field("live_since", &self.0.settings.live_since)
            .finish_non_exhaustive()
    }
}
