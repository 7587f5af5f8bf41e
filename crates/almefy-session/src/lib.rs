//! Session cache coordination for Almefy authentication.
//!
//! Several application instances share one key-value cache to agree on
//! which Almefy sessions are currently valid:
//! - A short-lived authoritative list, reloaded from the Almefy API
//! - A long-lived list of sessions seen locally, merged over it
//! - One entry per session, refreshed on every authenticated request
//!
//! Expired sessions are never returned, and sessions idle for longer than
//! the session TTL are pruned when the authoritative list is reloaded.
//!
//! # Example
//!
//! ```rust,ignore
//! use almefy_session::{MemoryStore, SessionConfig, SessionManager};
//!
//! let manager = SessionManager::new(SessionConfig::default(), api_client, Arc::new(MemoryStore::new()));
//! manager.add_session(session).await?;
//! let current = manager.refresh_session_by_identifier(&session_id, "user@example.com").await?;
//! ```

mod config;
mod error;
mod keys;
mod manager;
#[cfg(feature = "redis")]
mod redis_store;
mod session;
mod source;
mod store;
mod ttl;

pub use config::{
    DEFAULT_MAX_UPDATE_ATTEMPTS, DEFAULT_SESSION_CACHE_TTL, DEFAULT_SESSION_TTL, SessionConfig,
};
pub use error::{Error, Result};
pub use keys::CacheKey;
pub use manager::SessionManager;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
pub use session::{
    Session, SessionId, SessionMap, combine_sessions, from_unix_seconds, index_sessions,
    parse_timestamp, retain_live,
};
pub use source::{SessionSource, SharedSessionSource};
pub use store::{ABSENT, CacheItem, CacheStore, MemoryStore, SharedCacheStore};
pub use ttl::{Clock, Expiry, ManualClock, SharedClock, SystemClock, add_duration};
