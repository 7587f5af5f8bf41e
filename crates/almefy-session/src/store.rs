//! Cache store backends.
//!
//! The session manager talks to its key-value cache through the
//! [`CacheStore`] trait so it can be pointed at an in-process map during
//! tests or at a shared server in production. Every entry carries a
//! version; [`CacheStore::compare_and_set`] only writes when the caller's
//! version is still current, which lets read-modify-write sequences detect
//! concurrent writers instead of silently losing their updates.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::error::Result;
use crate::keys::CacheKey;
use crate::ttl::{Expiry, SharedClock, SystemClock};

/// Version reported for keys that do not exist.
pub const ABSENT: u64 = 0;

/// Writes between two sweeps of expired [`MemoryStore`] entries.
const SWEEP_INTERVAL: u64 = 256;

/// A value read from the store together with its version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheItem {
    /// Serialized value.
    pub value: String,

    /// Version of the entry; always greater than [`ABSENT`].
    pub version: u64,
}

/// Key-value cache with per-entry expiry and optimistic versioning.
#[async_trait]
pub trait CacheStore: Send + Sync + std::fmt::Debug {
    /// Read an entry. Expired entries are reported as missing.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheItem>>;

    /// Unconditionally write an entry.
    async fn set(&self, key: &CacheKey, value: String, expiry: Expiry) -> Result<()>;

    /// Write an entry only if its current version equals `expected`.
    ///
    /// Pass [`ABSENT`] to require that the key does not exist. Returns
    /// `false` when another writer got there first.
    async fn compare_and_set(
        &self,
        key: &CacheKey,
        expected: u64,
        value: String,
        expiry: Expiry,
    ) -> Result<bool>;

    /// Remove an entry. Removing a missing key is not an error.
    async fn delete(&self, key: &CacheKey) -> Result<()>;
}

/// Shared cache store handle.
pub type SharedCacheStore = Arc<dyn CacheStore>;

#[derive(Debug, Clone)]
struct StoredEntry {
    value: String,
    version: u64,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process cache store.
///
/// Expiry is evaluated lazily against the injected clock, so tests can move
/// time forward without sleeping. Expired entries are dropped when a write
/// finds them, and every [`SWEEP_INTERVAL`] writes a sweep removes the rest.
#[derive(Debug)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
    next_version: AtomicU64,
    writes: AtomicU64,
    clock: SharedClock,
}

impl MemoryStore {
    /// Create an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store on a custom clock.
    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_version: AtomicU64::new(ABSENT + 1),
            writes: AtomicU64::new(0),
            clock,
        }
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    /// Check if there are no live entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether a live entry exists for `key`.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        let now = self.clock.now();
        self.entries
            .read()
            .await
            .get(&key.render())
            .is_some_and(|e| e.is_live(now))
    }

    /// Absolute expiry of a live entry, if it has one.
    pub async fn expires_at(&self, key: &CacheKey) -> Option<DateTime<Utc>> {
        let now = self.clock.now();
        self.entries
            .read()
            .await
            .get(&key.render())
            .filter(|e| e.is_live(now))
            .and_then(|e| e.expires_at)
    }

    /// Remove every expired entry. Returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let count = purge_expired(&mut entries, now);
        if count > 0 {
            debug!(count, "Cleaned up expired cache entries");
        }
        count
    }

    /// Count a write and sweep expired entries when one is due.
    fn after_write(&self, entries: &mut HashMap<String, StoredEntry>, now: DateTime<Utc>) {
        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % SWEEP_INTERVAL == 0 {
            let count = purge_expired(entries, now);
            trace!(count, "Swept expired cache entries");
        }
    }

    fn entry(&self, value: String, expiry: Expiry) -> StoredEntry {
        StoredEntry {
            value,
            version: self.next_version.fetch_add(1, Ordering::SeqCst),
            expires_at: expiry.deadline(self.clock.now()),
        }
    }
}

fn purge_expired(entries: &mut HashMap<String, StoredEntry>, now: DateTime<Utc>) -> usize {
    let before = entries.len();
    entries.retain(|_, e| e.is_live(now));
    before - entries.len()
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheItem>> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(&key.render())
            .filter(|e| e.is_live(now))
            .map(|e| CacheItem {
                value: e.value.clone(),
                version: e.version,
            }))
    }

    async fn set(&self, key: &CacheKey, value: String, expiry: Expiry) -> Result<()> {
        let now = self.clock.now();
        let entry = self.entry(value, expiry);
        trace!(key = %key, version = entry.version, "Cache entry written");
        let mut entries = self.entries.write().await;
        entries.insert(key.render(), entry);
        self.after_write(&mut entries, now);
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &CacheKey,
        expected: u64,
        value: String,
        expiry: Expiry,
    ) -> Result<bool> {
        let now = self.clock.now();
        let rendered = key.render();
        let mut entries = self.entries.write().await;
        if entries.get(&rendered).is_some_and(|e| !e.is_live(now)) {
            entries.remove(&rendered);
        }
        let current = entries.get(&rendered).map_or(ABSENT, |e| e.version);

        if current != expected {
            trace!(key = %key, expected, current, "Cache compare-and-set lost");
            return Ok(false);
        }

        let entry = self.entry(value, expiry);
        trace!(key = %key, version = entry.version, "Cache entry swapped");
        entries.insert(rendered, entry);
        self.after_write(&mut entries, now);
        Ok(true)
    }

    async fn delete(&self, key: &CacheKey) -> Result<()> {
        self.entries.write().await.remove(&key.render());
        Ok(())
    }
}
