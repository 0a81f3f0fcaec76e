use crate::Snowflake;
use crate::clock::{SystemClock, TimeSource};
use crate::error::{BoxDynError, Error};
use crate::host::{self, HostSources};
use crate::layout::{DEFAULT_LIVE_SINCE_SECS, FieldOrder, Layout, TimeUnit};
use crate::registry::Registry;
use crate::snowflake::Settings;
use chrono::prelude::*;
use std::sync::Arc;

/// A builder for building the ['Snowflake'] generator or a ['Registry'] of them.
///
/// [`Snowflake`]: struct.Snowflake.html
/// [`Registry`]: struct.Registry.html
pub struct Builder<'a> {
    live_since: Option<DateTime<Utc>>,
    host_id: Option<&'a dyn Fn() -> Result<u16, BoxDynError>>,
    check_host_id: Option<&'a dyn Fn(u16) -> bool>,
    host_sources: Option<HostSources>,
    clock: Option<Arc<dyn TimeSource>>,
    layout: Layout,
}

impl<'a> Default for Builder<'a> {
    fn default() -> Self {
        Builder::new()
    }
}

impl<'a> Builder<'a> {
    /// Construct a new builder with the [`Layout::MILLIS`] layout.
    pub fn new() -> Self {
        Self {
            live_since: None,
            host_id: None,
            check_host_id: None,
            host_sources: None,
            clock: None,
            layout: Layout::MILLIS,
        }
    }

    /// Set the moment ids started being issued. [`Snowflake::verify`]
    /// rejects anything older. If the time is later than the current time,
    /// 'finalize' will fail.
    pub fn live_since(mut self, live_since: DateTime<Utc>) -> Self {
        self.live_since = Some(live_since);
        self
    }

    /// Set the host ID.
    /// If the provided closure returns an error, 'finalize' will fail.
    /// Without it the host ID is discovered from the environment, see [`crate::host`].
    pub fn host_id(mut self, host_id: &'a dyn Fn() -> Result<u16, BoxDynError>) -> Self {
        self.host_id = Some(host_id);
        self
    }

    /// Set up a function to check the host ID.
    /// If the function returns 'false', 'finalize' will fail.
    pub fn check_host_id(mut self, check_host_id: &'a dyn Fn(u16) -> bool) -> Self {
        self.check_host_id = Some(check_host_id);
        self
    }

    /// Discover the host ID from these environment variables instead of the
    /// process-wide defaults. Ignored when [`host_id`](Self::host_id) is set.
    pub fn host_sources(mut self, host_sources: HostSources) -> Self {
        self.host_sources = Some(host_sources);
        self
    }

    /// Replace the system clock.
    pub fn clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use a complete layout, e.g. [`Layout::SECONDS`].
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn time_unit(mut self, time_unit: TimeUnit) -> Self {
        self.layout.time_unit = time_unit;
        self
    }

    pub fn field_order(mut self, field_order: FieldOrder) -> Self {
        self.layout.field_order = field_order;
        self
    }

    /// Set the bit length of the time section.
    pub fn bit_len_time(mut self, bit_len_time: u8) -> Self {
        self.layout.bit_len_time = bit_len_time;
        self
    }

    /// Set the bit length of the host ID section.
    pub fn bit_len_host(mut self, bit_len_host: u8) -> Self {
        self.layout.bit_len_host = bit_len_host;
        self
    }

    /// Sets the bit length of the sequence section.
    pub fn bit_len_sequence(mut self, bit_len_sequence: u8) -> Self {
        self.layout.bit_len_sequence = bit_len_sequence;
        self
    }

    /// Finish building and create a Snowflake instance.
    /// This method will return an error if any of the configured functions return an error or if validation fails.
    pub fn finalize(self) -> Result<Snowflake, Error> {
        Ok(Snowflake::from_settings(self.settings()?))
    }

    /// Finish building and create a [`Registry`] whose groups all share this configuration.
    pub fn build_registry(self) -> Result<Registry, Error> {
        Ok(Registry::from_settings(self.settings()?))
    }

    fn settings(self) -> Result<Settings, Error> {
        let layout = self.layout;
        if !layout.is_valid() {
            return Err(Error::InvalidBitLength(
                layout.bit_len_time,
                layout.bit_len_host,
                layout.bit_len_sequence,
            ));
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        // A field that already wrapped would issue ids below older ones.
        let now = clock.now(layout.time_unit);
        if now > layout.max_time() {
            return Err(Error::OverTimeLimit {
                now,
                bit_len_time: layout.bit_len_time,
            });
        }

        let live_since = if let Some(live_since) = self.live_since {
            let units = layout.time_unit.units_of(live_since);
            if units > now {
                return Err(Error::LiveSinceAheadOfCurrentTime(live_since));
            }
            units
        } else {
            match layout.time_unit {
                TimeUnit::Seconds => DEFAULT_LIVE_SINCE_SECS as u64,
                TimeUnit::Millis => DEFAULT_LIVE_SINCE_SECS as u64 * 1000,
            }
        };

        let host_id_mask = layout.max_host();
        let host_id = if let Some(host_id_fn) = self.host_id {
            host_id_fn().map_err(Error::HostIdFailed)?
        } else if let Some(sources) = self.host_sources {
            sources.resolved().id & host_id_mask
        } else {
            host::host_id().id & host_id_mask
        };

        if host_id > host_id_mask {
            return Err(Error::HostIdFailed(
                format!(
                    "Host ID {} is greater than the max allowed value {}",
                    host_id, host_id_mask
                )
                .into(),
            ));
        }

        if let Some(check_host_id) = self.check_host_id
            && !check_host_id(host_id)
        {
            return Err(Error::CheckHostIdFailed);
        }

        Ok(Settings {
            layout,
            host_id,
            live_since,
            clock,
        })
    }
}
