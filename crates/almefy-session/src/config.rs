//! Configuration for the session manager.

use std::time::Duration;

/// Default inactivity timeout for a session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(360);

/// Default lifetime of the cached authoritative session list.
pub const DEFAULT_SESSION_CACHE_TTL: Duration = Duration::from_secs(15);

/// Default number of compare-and-set attempts per list update.
pub const DEFAULT_MAX_UPDATE_ATTEMPTS: usize = 8;

/// Upper bound for the inactivity window; keeps timestamp arithmetic in range.
const MAX_WINDOW_SECS: i64 = 100_000_000_000;

/// Configuration for the session manager.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sessions not refreshed within this duration lose their
    /// per-session cache entry.
    pub session_ttl: Duration,

    /// Lifetime of the cached authoritative session list. Also the
    /// multiplier for the active list lifetime.
    pub session_cache_ttl: Duration,

    /// How many times a list update is retried when another writer
    /// changes the entry first.
    pub max_update_attempts: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_ttl: DEFAULT_SESSION_TTL,
            session_cache_ttl: DEFAULT_SESSION_CACHE_TTL,
            max_update_attempts: DEFAULT_MAX_UPDATE_ATTEMPTS,
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session inactivity timeout.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Set the session list cache lifetime.
    pub fn with_session_cache_ttl(mut self, ttl: Duration) -> Self {
        self.session_cache_ttl = ttl;
        self
    }

    /// Set the compare-and-set attempt budget (at least one).
    pub fn with_max_update_attempts(mut self, attempts: usize) -> Self {
        self.max_update_attempts = attempts.max(1);
        self
    }

    /// Lifetime of the active session list: `session_ttl * session_cache_ttl`
    /// in seconds.
    pub fn active_list_ttl(&self) -> Duration {
        Duration::from_secs(
            self.session_ttl
                .as_secs()
                .saturating_mul(self.session_cache_ttl.as_secs()),
        )
    }

    /// Inactivity timeout as a chrono duration.
    pub(crate) fn inactivity_window(&self) -> chrono::Duration {
        let secs = i64::try_from(self.session_ttl.as_secs())
            .unwrap_or(i64::MAX)
            .min(MAX_WINDOW_SECS);
        chrono::Duration::seconds(secs)
    }
}
