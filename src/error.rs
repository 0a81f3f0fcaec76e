// Copyright 2022 houseme
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use chrono::{DateTime, Utc};
use std::error::Error as StdError;
use thiserror::Error;

/// Convenience type alias for usage within planeflake.
pub type BoxDynError = Box<dyn StdError + 'static + Send + Sync>;

/// The error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("clock moved backwards: last issued time unit {last}, observed {now}")]
    ClockMovedBackwards { last: u64, now: u64 },
    #[error("generator is poisoned after a clock regression and will not issue ids")]
    Poisoned,
    #[error("mutex is poisoned (i.e. a panic happened while it was locked)")]
    MutexPoisoned,
    #[error("live_since `{0}` is ahead of current time")]
    LiveSinceAheadOfCurrentTime(DateTime<Utc>),
    #[error("current time {now} does not fit in a {bit_len_time}-bit time field")]
    OverTimeLimit { now: u64, bit_len_time: u8 },
    #[error("host_id returned an error: {0}")]
    HostIdFailed(#[source] BoxDynError),
    #[error("check_host_id returned false")]
    CheckHostIdFailed,
    #[error(
        "invalid bit length configuration: time({0}) + host({1}) + sequence({2}) must be 60, host <= 16, sequence <= 32, none zero"
    )]
    InvalidBitLength(u8, u8, u8),
}

impl Error {
    /// Whether the generator that produced this error can never issue ids again.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ClockMovedBackwards { .. } | Error::Poisoned | Error::MutexPoisoned
        )
    }
}
