//! Cache key construction.

use std::fmt;

use crate::session::{Session, SessionId};

const SESSION_LIST_KEY: &str = "ALMEFY_SESSION_LIST";
const ACTIVE_SESSION_LIST_KEY: &str = "ALMEFY_ACTIVE_SESSION_LIST";
const SESSION_KEY_PREFIX: &str = "ALMEFY_SESSION_";

/// The three cache namespaces used by the session manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Authoritative list fetched from the API (short TTL).
    SessionList,
    /// Locally tracked active sessions (long TTL).
    ActiveSessionList,
    /// One entry per session, expiring with the session.
    Session(SessionId),
}

impl CacheKey {
    /// Key of the per-session entry for `session`.
    pub fn for_session(session: &Session) -> Self {
        CacheKey::Session(session.id.clone())
    }

    /// Rendered key as stored in the backend.
    pub fn render(&self) -> String {
        match self {
            CacheKey::SessionList => SESSION_LIST_KEY.to_string(),
            CacheKey::ActiveSessionList => ACTIVE_SESSION_LIST_KEY.to_string(),
            CacheKey::Session(id) => format!("{SESSION_KEY_PREFIX}{id}"),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
