use crate::layout::TimeUnit;
use chrono::Utc;

/// A source of wall-clock time, truncated to whole units since the Unix epoch.
///
/// Generators read the clock on every call, so implementations should be
/// cheap. Plug in a fake in tests to drive overflow and regression paths.
pub trait TimeSource: Send + Sync {
    fn now(&self, unit: TimeUnit) -> u64;
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self, unit: TimeUnit) -> u64 {
        unit.units_of(Utc::now())
    }
}
