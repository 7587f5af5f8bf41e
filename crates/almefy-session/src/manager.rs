//! Session manager reconciling the three session cache namespaces.
//!
//! The manager keeps a TTL-bounded view of the currently active sessions:
//! - `SESSION_LIST`: the authoritative list fetched from the API, cached briefly
//! - `ACTIVE_SESSION_LIST`: sessions seen locally, cached for much longer
//! - `SESSION_<id>`: one entry per session, expiring with the session
//!
//! Pruning is lazy: expired sessions are filtered out whenever a list is
//! read, and per-session entries are removed when the authoritative list
//! is reloaded. List writes go through compare-and-set so two requests
//! refreshing at the same time cannot silently drop each other's update.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::keys::CacheKey;
use crate::session::{
    Session, SessionId, SessionMap, combine_sessions, index_sessions, retain_live,
};
use crate::source::SharedSessionSource;
use crate::store::{ABSENT, SharedCacheStore};
use crate::ttl::{Expiry, SharedClock, SystemClock};

/// Coordinates the session caches for the authentication layer.
///
/// Cheap to clone; clones share the same store, source and clock.
#[derive(Debug, Clone)]
pub struct SessionManager {
    source: SharedSessionSource,
    store: SharedCacheStore,
    clock: SharedClock,
    config: SessionConfig,
}

impl SessionManager {
    /// Create a manager on the system clock.
    pub fn new(config: SessionConfig, source: SharedSessionSource, store: SharedCacheStore) -> Self {
        Self {
            source,
            store,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the clock used for expiry decisions.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Get the manager configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Register a newly authenticated session.
    ///
    /// The session is added to the authoritative list unless a session with
    /// the same id is already there. Returns the refreshed active view.
    pub async fn add_session(&self, session: Session) -> Result<SessionMap> {
        debug!(
            session_id = %session.id,
            identifier = %session.identifier,
            "Registering session"
        );

        self.prime_session_entry(&session).await?;
        let sessions = self.update_session_list(session).await?;
        self.refresh_active_session_list(sessions).await
    }

    /// Merge `sessions` over the active list, drop expired entries and
    /// store the result.
    ///
    /// The returned map never contains a session expired at call time.
    pub async fn refresh_active_session_list(&self, sessions: SessionMap) -> Result<SessionMap> {
        let now = self.clock.now();
        let expiry = Expiry::After(self.config.active_list_ttl());

        let active = self
            .update_map(&CacheKey::ActiveSessionList, expiry, |active| {
                Some(retain_live(combine_sessions(sessions.clone(), active), now))
            })
            .await?;

        trace!(active = active.len(), "Active session list refreshed");
        Ok(active)
    }

    /// Refresh a session on behalf of `identifier` and return it.
    ///
    /// Fails with [`Error::AccessDenied`] when the session is unknown,
    /// expired, or owned by someone else. The three cases are not
    /// distinguished so callers cannot tell which session ids exist.
    pub async fn refresh_session_by_identifier(
        &self,
        session_id: &SessionId,
        identifier: &str,
    ) -> Result<Session> {
        let refreshed = self.touch_session_entry(session_id, identifier).await?;
        let owned = refreshed.contains_key(session_id);

        self.update_active_session_list(&refreshed, session_id).await;

        let sessions = self.get_sessions().await?;
        let active = self.refresh_active_session_list(sessions).await?;

        match active.get(session_id) {
            Some(session) if owned && session.belongs_to(identifier) => {
                trace!(session_id = %session_id, "Session refreshed");
                Ok(session.clone())
            }
            _ => {
                debug!(session_id = %session_id, "Session refresh denied");
                Err(Error::AccessDenied(session_id.clone()))
            }
        }
    }

    /// Current sessions: the authoritative list merged with the active list.
    ///
    /// When the authoritative list has expired from the cache, stale
    /// per-session entries are pruned and the list is reloaded from the
    /// session source for the active ids.
    pub async fn get_sessions(&self) -> Result<SessionMap> {
        let active = self
            .read_map(&CacheKey::ActiveSessionList)
            .await?
            .unwrap_or_default();

        let session_list = match self.read_map(&CacheKey::SessionList).await? {
            Some(list) => {
                trace!(sessions = list.len(), "Session list cache hit");
                list
            }
            None => self.load_session_list(&active).await?,
        };

        Ok(combine_sessions(session_list, active))
    }

    /// Replace the active entry for `session_id` with its refreshed copy.
    ///
    /// Nothing is written unless both an active entry and a refreshed entry
    /// exist, so this never introduces a new id. The write is best-effort:
    /// failures are logged and otherwise ignored.
    pub async fn update_active_session_list(&self, refreshed: &SessionMap, session_id: &SessionId) {
        let Some(candidate) = refreshed.get(session_id) else {
            return;
        };

        let now = self.clock.now();
        let expiry = Expiry::After(self.config.active_list_ttl());
        let result = self
            .update_map(&CacheKey::ActiveSessionList, expiry, |mut active| {
                if !active.contains_key(session_id) {
                    return None;
                }
                active.insert(session_id.clone(), candidate.with_updated_at(now));
                Some(active)
            })
            .await;

        if let Err(e) = result {
            warn!(session_id = %session_id, error = %e, "Active session update dropped");
        }
    }

    /// Delete per-session entries of `active` that have expired or have not
    /// been refreshed within the session TTL. Returns how many were deleted.
    pub async fn remove_expired_sessions(&self, active: &SessionMap) -> Result<usize> {
        let now = self.clock.now();
        let window = self.config.inactivity_window();
        let mut removed = 0;

        for session in active.values() {
            let key = CacheKey::for_session(session);
            let current = match self.store.get(&key).await? {
                Some(item) => serde_json::from_str::<Session>(&item.value)?,
                None => session.clone(),
            };

            if current.expires_at < now || current.is_inactive_at(now, window) {
                debug!(session_id = %session.id, "Removing stale session entry");
                self.store.delete(&key).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(count = removed, "Removed stale session entries");
        }

        Ok(removed)
    }

    /// Create the per-session entry unless one exists already.
    async fn prime_session_entry(&self, session: &Session) -> Result<()> {
        let key = CacheKey::for_session(session);
        let encoded = serde_json::to_string(session)?;
        let created = self
            .store
            .compare_and_set(&key, ABSENT, encoded, Expiry::At(session.expires_at))
            .await?;

        if !created {
            trace!(session_id = %session.id, "Session entry already present");
        }
        Ok(())
    }

    /// Add `session` to the authoritative list; an existing entry wins.
    async fn update_session_list(&self, session: Session) -> Result<SessionMap> {
        let expiry = Expiry::After(self.config.session_cache_ttl);
        self.update_map(&CacheKey::SessionList, expiry, |mut list| {
            list.entry(session.id.clone())
                .or_insert_with(|| session.clone());
            Some(list)
        })
        .await
    }

    /// Stamp the per-session entry as used, if it belongs to `identifier`.
    ///
    /// Returns a one-entry map with the refreshed session, or an empty map
    /// when there is no matching entry.
    async fn touch_session_entry(
        &self,
        session_id: &SessionId,
        identifier: &str,
    ) -> Result<SessionMap> {
        let key = CacheKey::Session(session_id.clone());
        let Some(item) = self.store.get(&key).await? else {
            trace!(session_id = %session_id, "No session entry to refresh");
            return Ok(SessionMap::new());
        };

        let stored: Session = serde_json::from_str(&item.value)?;
        if !stored.belongs_to(identifier) || stored.id != *session_id {
            warn!(session_id = %session_id, "Session entry owned by another identifier");
            return Ok(SessionMap::new());
        }

        let updated = stored.with_updated_at(self.clock.now());
        let swapped = self
            .store
            .compare_and_set(
                &key,
                item.version,
                serde_json::to_string(&updated)?,
                Expiry::At(updated.expires_at),
            )
            .await?;

        if !swapped {
            // Someone else refreshed it in between; their stamp is as good as ours.
            trace!(session_id = %session_id, "Session entry refreshed concurrently");
        }

        Ok(index_sessions([updated]))
    }

    /// Fetch the authoritative list for the active ids and cache it.
    async fn load_session_list(&self, active: &SessionMap) -> Result<SessionMap> {
        self.remove_expired_sessions(active).await?;

        let ids: Vec<SessionId> = active.keys().cloned().collect();
        let fetched = self.source.get_sessions(&ids).await?;
        let list = retain_live(index_sessions(fetched), self.clock.now());

        debug!(
            requested = ids.len(),
            live = list.len(),
            "Session list reloaded from source"
        );

        let key = CacheKey::SessionList;
        let expiry = Expiry::After(self.config.session_cache_ttl);
        let stored = self
            .store
            .compare_and_set(&key, ABSENT, serde_json::to_string(&list)?, expiry)
            .await?;

        if stored {
            return Ok(list);
        }

        // Another writer repopulated the list first; prefer its copy.
        Ok(self.read_map(&key).await?.unwrap_or(list))
    }

    async fn read_map(&self, key: &CacheKey) -> Result<Option<SessionMap>> {
        match self.store.get(key).await? {
            Some(item) => Ok(Some(serde_json::from_str(&item.value)?)),
            None => Ok(None),
        }
    }

    /// Read-modify-write of a session list with optimistic concurrency.
    ///
    /// `f` receives the current map (empty when missing) and returns the
    /// new map, or `None` to leave the entry untouched. Returns the map
    /// that is stored once the call succeeds.
    async fn update_map<F>(&self, key: &CacheKey, expiry: Expiry, mut f: F) -> Result<SessionMap>
    where
        F: FnMut(SessionMap) -> Option<SessionMap>,
    {
        for attempt in 1..=self.config.max_update_attempts {
            let (current, version) = match self.store.get(key).await? {
                Some(item) => (serde_json::from_str::<SessionMap>(&item.value)?, item.version),
                None => (SessionMap::new(), ABSENT),
            };

            let Some(next) = f(current.clone()) else {
                return Ok(current);
            };

            let encoded = serde_json::to_string(&next)?;
            if self
                .store
                .compare_and_set(key, version, encoded, expiry)
                .await?
            {
                return Ok(next);
            }

            trace!(key = %key, attempt, "Cache entry changed during update, retrying");
        }

        warn!(
            key = %key,
            attempts = self.config.max_update_attempts,
            "Giving up on contended cache update"
        );
        Err(Error::Contention(key.render()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SessionSource;
    use crate::store::{CacheItem, CacheStore, MemoryStore};
    use crate::ttl::{Clock, ManualClock};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Session source that returns whatever it was seeded with, filtered by id.
    #[derive(Debug, Default)]
    struct FakeSource {
        sessions: Mutex<Vec<Session>>,
        calls: AtomicUsize,
        fail: Mutex<bool>,
    }

    impl FakeSource {
        fn seed(&self, sessions: Vec<Session>) {
            *self.sessions.lock() = sessions;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SessionSource for FakeSource {
        async fn get_sessions(&self, ids: &[SessionId]) -> Result<Vec<Session>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if *self.fail.lock() {
                return Err(Error::Source("backend unavailable".to_string()));
            }
            Ok(self
                .sessions
                .lock()
                .iter()
                .filter(|s| ids.contains(&s.id))
                .cloned()
                .collect())
        }
    }

    /// Store whose compare-and-set always loses.
    #[derive(Debug, Default)]
    struct ContendedStore(MemoryStore);

    #[async_trait]
    impl CacheStore for ContendedStore {
        async fn get(&self, key: &CacheKey) -> Result<Option<CacheItem>> {
            self.0.get(key).await
        }

        async fn set(&self, key: &CacheKey, value: String, expiry: Expiry) -> Result<()> {
            self.0.set(key, value, expiry).await
        }

        async fn compare_and_set(
            &self,
            _key: &CacheKey,
            _expected: u64,
            _value: String,
            _expiry: Expiry,
        ) -> Result<bool> {
            Ok(false)
        }

        async fn delete(&self, key: &CacheKey) -> Result<()> {
            self.0.delete(key).await
        }
    }

    struct Harness {
        manager: SessionManager,
        store: Arc<MemoryStore>,
        source: Arc<FakeSource>,
        clock: ManualClock,
    }

    fn start() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn harness() -> Harness {
        let clock = ManualClock::new(start());
        let store = Arc::new(MemoryStore::with_clock(Arc::new(clock.clone())));
        let source = Arc::new(FakeSource::default());
        let manager = SessionManager::new(SessionConfig::default(), source.clone(), store.clone())
            .with_clock(Arc::new(clock.clone()));
        Harness {
            manager,
            store,
            source,
            clock,
        }
    }

    fn id(raw: &str) -> SessionId {
        SessionId::parse(raw).unwrap()
    }

    /// Session owned by `identifier` expiring `expires_in` seconds after the
    /// harness start and last updated `updated_ago` seconds before it.
    fn session(raw: &str, identifier: &str, expires_in: i64, updated_ago: i64) -> Session {
        Session::new(
            id(raw),
            identifier,
            start() + chrono::Duration::seconds(expires_in),
            start() - chrono::Duration::seconds(updated_ago),
        )
    }

    #[tokio::test]
    async fn test_added_session_is_active_and_listed() {
        let h = harness();
        let s1 = session("s1", "u1", 300, 0);

        let active = h.manager.add_session(s1.clone()).await.unwrap();
        assert_eq!(active.get(&id("s1")), Some(&s1));

        let sessions = h.manager.get_sessions().await.unwrap();
        assert_eq!(sessions.get(&id("s1")), Some(&s1));
        assert!(h.store.contains(&CacheKey::Session(id("s1"))).await);
        // The list was still cached, so the source was not consulted.
        assert_eq!(h.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_add_session_first_write_wins() {
        let h = harness();
        let first = session("s1", "u1", 300, 0);
        let second = session("s1", "u1", 900, 0);

        h.manager.add_session(first.clone()).await.unwrap();
        let active = h.manager.add_session(second).await.unwrap();

        let list: SessionMap = serde_json::from_str(
            &h.store.get(&CacheKey::SessionList).await.unwrap().unwrap().value,
        )
        .unwrap();
        assert_eq!(list.get(&id("s1")), Some(&first));
        assert_eq!(active[&id("s1")].expires_at, first.expires_at);
    }

    #[tokio::test]
    async fn test_session_entry_expires_with_session() {
        let h = harness();
        let s1 = session("s1", "u1", 300, 0);
        h.manager.add_session(s1.clone()).await.unwrap();

        assert_eq!(
            h.store.expires_at(&CacheKey::Session(id("s1"))).await,
            Some(s1.expires_at)
        );
    }

    #[tokio::test]
    async fn test_refresh_active_list_filters_expired() {
        let h = harness();
        let expired = session("old", "u1", -10, 0);
        let live = session("new", "u1", 300, 0);

        let active = h
            .manager
            .refresh_active_session_list(index_sessions([expired, live]))
            .await
            .unwrap();

        assert!(!active.contains_key(&id("old")));
        assert!(active.contains_key(&id("new")));
        assert_eq!(
            h.store.expires_at(&CacheKey::ActiveSessionList).await,
            Some(start() + chrono::Duration::seconds(5_400))
        );
    }

    #[tokio::test]
    async fn test_refresh_active_list_drops_previously_active_after_expiry() {
        let h = harness();
        h.manager.add_session(session("s1", "u1", 30, 0)).await.unwrap();

        h.clock.advance(Duration::from_secs(31));
        let active = h
            .manager
            .refresh_active_session_list(SessionMap::new())
            .await
            .unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_active_list_takes_authoritative_expiry() {
        let h = harness();
        h.manager.add_session(session("s1", "u1", 300, 60)).await.unwrap();

        let authoritative = session("s1", "u1", 600, 0);
        let active = h
            .manager
            .refresh_active_session_list(index_sessions([authoritative.clone()]))
            .await
            .unwrap();

        let merged = &active[&id("s1")];
        assert_eq!(merged.expires_at, authoritative.expires_at);
        assert_eq!(merged.updated_at, start() - chrono::Duration::seconds(60));
    }

    #[tokio::test]
    async fn test_refresh_by_identifier_updates_timestamp() {
        let h = harness();
        h.manager.add_session(session("s1", "u1", 300, 30)).await.unwrap();

        h.clock.advance(Duration::from_secs(5));
        let refreshed = h
            .manager
            .refresh_session_by_identifier(&id("s1"), "u1")
            .await
            .unwrap();

        assert_eq!(refreshed.updated_at, h.clock.now());

        let entry: Session = serde_json::from_str(
            &h.store
                .get(&CacheKey::Session(id("s1")))
                .await
                .unwrap()
                .unwrap()
                .value,
        )
        .unwrap();
        assert_eq!(entry.updated_at, h.clock.now());
    }

    #[tokio::test]
    async fn test_refresh_by_identifier_denies_unknown_session() {
        let h = harness();
        let err = h
            .manager
            .refresh_session_by_identifier(&id("missing"), "u1")
            .await
            .unwrap_err();
        assert!(err.is_access_denied());
    }

    #[tokio::test]
    async fn test_refresh_by_identifier_denies_other_owner() {
        let h = harness();
        h.manager.add_session(session("s1", "u2", 300, 0)).await.unwrap();

        let err = h
            .manager
            .refresh_session_by_identifier(&id("s1"), "u1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AccessDenied(ref denied) if *denied == id("s1")));
    }

    #[tokio::test]
    async fn test_refresh_by_identifier_denies_expired_session() {
        let h = harness();
        h.manager.add_session(session("s1", "u1", 60, 0)).await.unwrap();

        h.clock.advance(Duration::from_secs(61));
        let err = h
            .manager
            .refresh_session_by_identifier(&id("s1"), "u1")
            .await
            .unwrap_err();
        assert!(err.is_access_denied());
    }

    #[tokio::test]
    async fn test_refresh_by_identifier_denies_without_session_entry() {
        let h = harness();
        h.manager.add_session(session("s1", "u1", 300, 0)).await.unwrap();
        h.store.delete(&CacheKey::Session(id("s1"))).await.unwrap();

        let err = h
            .manager
            .refresh_session_by_identifier(&id("s1"), "u1")
            .await
            .unwrap_err();
        assert!(err.is_access_denied());
    }

    #[tokio::test]
    async fn test_update_active_list_never_adds_ids() {
        let h = harness();
        let refreshed = index_sessions([session("s1", "u1", 300, 0)]);

        h.manager
            .update_active_session_list(&refreshed, &id("s1"))
            .await;
        assert!(!h.store.contains(&CacheKey::ActiveSessionList).await);

        h.manager.add_session(session("s2", "u1", 300, 0)).await.unwrap();
        h.manager
            .update_active_session_list(&refreshed, &id("s1"))
            .await;

        let active: SessionMap = serde_json::from_str(
            &h.store
                .get(&CacheKey::ActiveSessionList)
                .await
                .unwrap()
                .unwrap()
                .value,
        )
        .unwrap();
        assert!(!active.contains_key(&id("s1")));
        assert!(active.contains_key(&id("s2")));
    }

    #[tokio::test]
    async fn test_session_list_reloaded_from_source_after_cache_ttl() {
        let h = harness();
        let s1 = session("s1", "u1", 300, 0);
        h.manager.add_session(s1.clone()).await.unwrap();

        let server_copy = s1.with_expires_at(start() + chrono::Duration::seconds(600));
        h.source.seed(vec![server_copy.clone(), session("other", "u9", 300, 0)]);

        h.clock.advance(Duration::from_secs(16));
        let sessions = h.manager.get_sessions().await.unwrap();

        assert_eq!(h.source.calls(), 1);
        // Only ids known to be active are requested.
        assert!(!sessions.contains_key(&id("other")));
        assert_eq!(sessions[&id("s1")].expires_at, server_copy.expires_at);

        // The reloaded list is cached again.
        h.manager.get_sessions().await.unwrap();
        assert_eq!(h.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_reload_discards_sessions_expired_at_source() {
        let h = harness();
        h.manager.add_session(session("s1", "u1", 300, 0)).await.unwrap();
        h.source.seed(vec![session("s1", "u1", 10, 0)]);

        h.clock.advance(Duration::from_secs(16));
        h.manager.get_sessions().await.unwrap();

        let list: SessionMap = serde_json::from_str(
            &h.store.get(&CacheKey::SessionList).await.unwrap().unwrap().value,
        )
        .unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn test_source_errors_propagate() {
        let h = harness();
        *h.source.fail.lock() = true;

        let err = h.manager.get_sessions().await.unwrap_err();
        assert!(matches!(err, Error::Source(_)));
    }

    #[tokio::test]
    async fn test_remove_expired_sessions_deletes_expired_entry() {
        let h = harness();
        let s1 = session("s1", "u1", 300, 0);
        h.manager.add_session(s1.clone()).await.unwrap();

        let expired = session("s1", "u1", -10, 0);
        h.store
            .set(
                &CacheKey::Session(id("s1")),
                serde_json::to_string(&expired).unwrap(),
                Expiry::Never,
            )
            .await
            .unwrap();

        let removed = h
            .manager
            .remove_expired_sessions(&index_sessions([s1]))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(!h.store.contains(&CacheKey::Session(id("s1"))).await);
    }

    #[tokio::test]
    async fn test_remove_expired_sessions_prunes_inactive() {
        let h = harness();
        let idle = session("s1", "u1", 3_600, 400);
        h.manager.add_session(idle.clone()).await.unwrap();

        let removed = h
            .manager
            .remove_expired_sessions(&index_sessions([idle]))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(!h.store.contains(&CacheKey::Session(id("s1"))).await);
    }

    #[tokio::test]
    async fn test_remove_expired_sessions_keeps_live_entries() {
        let h = harness();
        let fresh = session("s1", "u1", 3_600, 10);
        h.manager.add_session(fresh.clone()).await.unwrap();

        let removed = h
            .manager
            .remove_expired_sessions(&index_sessions([fresh]))
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert!(h.store.contains(&CacheKey::Session(id("s1"))).await);
    }

    #[tokio::test]
    async fn test_idle_session_is_pruned_by_another_refresh() {
        let h = harness();
        h.manager.add_session(session("s1", "u1", 3_600, 0)).await.unwrap();
        h.manager.add_session(session("s2", "u2", 3_600, 0)).await.unwrap();
        h.source.seed(vec![
            session("s1", "u1", 3_600, 0),
            session("s2", "u2", 3_600, 0),
        ]);

        // Past the session TTL; the list reload triggered by s1 prunes s2.
        h.clock.advance(Duration::from_secs(400));
        h.manager
            .refresh_session_by_identifier(&id("s1"), "u1")
            .await
            .unwrap();
        assert!(!h.store.contains(&CacheKey::Session(id("s2"))).await);

        let err = h
            .manager
            .refresh_session_by_identifier(&id("s2"), "u2")
            .await
            .unwrap_err();
        assert!(err.is_access_denied());
    }

    #[tokio::test]
    async fn test_regular_refresh_keeps_session_alive() {
        let h = harness();
        h.manager.add_session(session("s1", "u1", 3_600, 0)).await.unwrap();
        h.source.seed(vec![session("s1", "u1", 3_600, 0)]);

        for _ in 0..4 {
            h.clock.advance(Duration::from_secs(300));
            h.manager
                .refresh_session_by_identifier(&id("s1"), "u1")
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_contention_is_reported() {
        let clock = ManualClock::new(start());
        let manager = SessionManager::new(
            SessionConfig::default().with_max_update_attempts(3),
            Arc::new(FakeSource::default()),
            Arc::new(ContendedStore::default()),
        )
        .with_clock(Arc::new(clock));

        let err = manager
            .add_session(session("s1", "u1", 300, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Contention(ref key) if key == "ALMEFY_SESSION_LIST"));
    }
}
