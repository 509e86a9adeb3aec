//! Clock used by room actors.
//!
//! Wall-clock milliseconds are anchored once and then advanced with tokio's
//! monotonic clock, so deadlines computed from `Timestamp`s line up with
//! `tokio::time::sleep_until` (including paused time in tests).

use std::time::Duration;

use keyrace_shared::time::{Clock, get_utc_timestamp};
use tokio::time::Instant;

use crate::domain::Timestamp;

#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin_millis: i64,
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self::starting_at(get_utc_timestamp())
    }

    pub fn starting_at(origin_millis: i64) -> Self {
        Self {
            origin_millis,
            origin: Instant::now(),
        }
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::new(self.now_millis())
    }

    /// Tokio instant at which `at` will be reached
    pub fn instant_at(&self, at: Timestamp) -> Instant {
        let offset = at.value().saturating_sub(self.origin_millis).max(0);
        self.origin + Duration::from_millis(u64::try_from(offset).unwrap_or_default())
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_millis(&self) -> i64 {
        let elapsed = i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.origin_millis.saturating_add(elapsed)
    }
}
