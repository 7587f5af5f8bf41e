//! Time sources and cache entry expiry.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = add_duration(*now, by);
    }

    /// Jump to an absolute time.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// When a cache entry stops being visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Kept until deleted or evicted by the backend.
    Never,
    /// Expires the given duration after the write.
    After(Duration),
    /// Expires at an absolute time.
    At(DateTime<Utc>),
}

impl Expiry {
    /// Absolute deadline of an entry written at `now`.
    pub fn deadline(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Expiry::Never => None,
            Expiry::After(ttl) => Some(add_duration(now, *ttl)),
            Expiry::At(at) => Some(*at),
        }
    }

    /// Remaining lifetime in whole seconds for backends with second
    /// resolution. `Some(0)` means already expired.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> Option<u64> {
        self.deadline(now)
            .map(|deadline| (deadline - now).num_seconds().max(0) as u64)
    }
}

/// Add a std duration to a timestamp, saturating at the latest representable time.
pub fn add_duration(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(by)
        .ok()
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let start = Utc.timestamp_opt(1_000, 0).unwrap();
        let clock = ManualClock::new(start);
        let other = clock.clone();

        clock.advance(Duration::from_secs(30));
        assert_eq!(other.now(), Utc.timestamp_opt(1_030, 0).unwrap());

        other.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_expiry_deadline() {
        let now = Utc.timestamp_opt(1_000, 0).unwrap();
        let at = Utc.timestamp_opt(2_000, 0).unwrap();

        assert_eq!(Expiry::Never.deadline(now), None);
        assert_eq!(
            Expiry::After(Duration::from_secs(15)).deadline(now),
            Some(Utc.timestamp_opt(1_015, 0).unwrap())
        );
        assert_eq!(Expiry::At(at).deadline(now), Some(at));
    }

    #[test]
    fn test_remaining_secs_never_negative() {
        let now = Utc.timestamp_opt(1_000, 0).unwrap();
        let past = Utc.timestamp_opt(900, 0).unwrap();

        assert_eq!(Expiry::At(past).remaining_secs(now), Some(0));
        assert_eq!(
            Expiry::After(Duration::from_secs(60)).remaining_secs(now),
            Some(60)
        );
        assert_eq!(Expiry::Never.remaining_secs(now), None);
    }
}
