//! Commit and expiry times
//!
//! Microseconds since Unix epoch. Virtual attributes expose them truncated
//! to whole seconds.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Microsecond-precision timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Never-modified documents carry this
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Wall-clock time; `EPOCH` if the clock reads before 1970
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(u64::try_from(since_epoch.as_micros()).unwrap_or(u64::MAX))
    }

    pub const fn from_secs(secs: u64) -> Self {
        Timestamp(secs.saturating_mul(1_000_000))
    }

    /// Whole seconds, truncated
    pub const fn as_secs(&self) -> u64 {
        self.0 / 1_000_000
    }

    /// `self + ttl`, clamped at the largest representable time
    pub fn saturating_add(&self, ttl: Duration) -> Self {
        let micros = u64::try_from(ttl.as_micros()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(micros))
    }
}
