//! Redis-backed cache store.
//!
//! Each cache entry is a hash with `data` and `version` fields. Versions
//! come from a shared counter key so they never repeat, even after an
//! entry is deleted and recreated. Writes run as Lua scripts so the version
//! check and the write happen atomically on the server.

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::keys::CacheKey;
use crate::store::{ABSENT, CacheItem, CacheStore};
use crate::ttl::Expiry;

/// Expected version that skips the version check.
const UNCONDITIONAL: i64 = -1;

/// TTL argument meaning "no expiry".
const NO_EXPIRY: i64 = -1;

// KEYS[1] entry, KEYS[2] version counter
// ARGV[1] expected version (-1 = any), ARGV[2] data, ARGV[3] ttl seconds (-1 = none)
const WRITE_SCRIPT: &str = r"
local expected = tonumber(ARGV[1])
if expected >= 0 then
  local current = tonumber(redis.call('HGET', KEYS[1], 'version') or '0')
  if current ~= expected then
    return 0
  end
end
local ttl = tonumber(ARGV[3])
if ttl == 0 then
  redis.call('DEL', KEYS[1])
  return 1
end
local version = redis.call('INCR', KEYS[2])
redis.call('DEL', KEYS[1])
redis.call('HSET', KEYS[1], 'data', ARGV[2], 'version', version)
if ttl > 0 then
  redis.call('EXPIRE', KEYS[1], ttl)
end
return 1
";

/// Cache store on a Redis (or Valkey) server.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
    write: Script,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect to `url`. Keys are namespaced with `prefix`.
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(url).map_err(store_error)?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(store_error)?;
        let prefix = prefix.into();
        debug!(prefix = %prefix, "Connected to Redis cache store");
        Ok(Self::from_connection(conn, prefix))
    }

    /// Wrap an existing connection manager.
    pub fn from_connection(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
            write: Script::new(WRITE_SCRIPT),
        }
    }

    fn entry_key(&self, key: &CacheKey) -> String {
        prefixed(&self.prefix, &key.render())
    }

    fn counter_key(&self) -> String {
        prefixed(&self.prefix, "__version")
    }

    async fn write(&self, key: &CacheKey, expected: i64, value: String, expiry: Expiry) -> Result<bool> {
        let ttl = expiry
            .remaining_secs(Utc::now())
            .map_or(NO_EXPIRY, |secs| i64::try_from(secs).unwrap_or(i64::MAX));

        let mut conn = self.conn.clone();
        let written: i64 = self
            .write
            .key(self.entry_key(key))
            .key(self.counter_key())
            .arg(expected)
            .arg(value)
            .arg(ttl)
            .invoke_async(&mut conn)
            .await
            .map_err(store_error)?;

        trace!(key = %key, expected, written, "Redis cache write");
        Ok(written == 1)
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheItem>> {
        let mut conn = self.conn.clone();
        let (value, version): (Option<String>, Option<u64>) = redis::cmd("HMGET")
            .arg(self.entry_key(key))
            .arg("data")
            .arg("version")
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;

        Ok(match (value, version) {
            (Some(value), Some(version)) if version > ABSENT => Some(CacheItem { value, version }),
            _ => None,
        })
    }

    async fn set(&self, key: &CacheKey, value: String, expiry: Expiry) -> Result<()> {
        self.write(key, UNCONDITIONAL, value, expiry).await.map(|_| ())
    }

    async fn compare_and_set(
        &self,
        key: &CacheKey,
        expected: u64,
        value: String,
        expiry: Expiry,
    ) -> Result<bool> {
        let expected = i64::try_from(expected)
            .map_err(|_| Error::Store(format!("version out of range: {expected}")))?;
        self.write(key, expected, value, expiry).await
    }

    async fn delete(&self, key: &CacheKey) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(self.entry_key(key)).await.map_err(store_error)?;
        Ok(())
    }
}

fn prefixed(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}:{key}")
    }
}

fn store_error(e: redis::RedisError) -> Error {
    Error::Store(e.to_string())
}
