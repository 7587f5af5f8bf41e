//! Error types for session coordination.

use crate::session::SessionId;

/// Error type for session coordination.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No active session matches the request. Deliberately does not say why.
    #[error("Access denied for session: {0}")]
    AccessDenied(SessionId),

    /// A session record or id could not be built.
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// A timestamp could not be parsed.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Error from the cache store backend.
    #[error("Cache store error: {0}")]
    Store(String),

    /// Error from the session source (the remote API).
    #[error("Session source error: {0}")]
    Source(String),

    /// A cached value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A cache entry kept changing underneath a read-modify-write.
    #[error("Concurrent update conflict on cache key: {0}")]
    Contention(String),
}

impl Error {
    /// Whether this error means the caller must re-authenticate.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Error::AccessDenied(_))
    }
}

/// Result type for session coordination.
pub type Result<T> = std::result::Result<T, Error>;
