//! Session records and the merge rule between session lists.
//!
//! A [`Session`] is an immutable value: "updating" one produces a new
//! record. Timestamps are normalized to `DateTime<Utc>` when a record is
//! built or deserialized, so malformed dates are rejected at the boundary
//! instead of at every use site.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Mapping of session id to session, as stored in the list cache entries.
pub type SessionMap = BTreeMap<SessionId, Session>;

/// Opaque, non-empty session identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Parse a session id, rejecting blank input.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(Error::InvalidSession("session id must not be empty".to_string()));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for SessionId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// One authenticated login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Stable identifier for the lifetime of the session.
    pub id: SessionId,

    /// Identifier of the user owning the session.
    pub identifier: String,

    /// Absolute time after which the session is invalid.
    #[serde(with = "timestamp", alias = "expires_at")]
    pub expires_at: DateTime<Utc>,

    /// Last refresh; drives inactivity pruning.
    #[serde(with = "timestamp", alias = "updated_at")]
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session record.
    pub fn new(
        id: SessionId,
        identifier: impl Into<String>,
        expires_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            identifier: identifier.into(),
            expires_at,
            updated_at,
        }
    }

    /// Build a session from an API payload.
    ///
    /// Timestamps may be Unix seconds, RFC 3339 strings or
    /// `YYYY-MM-DD HH:MM:SS` (UTC) strings.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::InvalidSession(e.to_string()))
    }

    /// Copy with a new last-update time.
    #[must_use]
    pub fn with_updated_at(&self, updated_at: DateTime<Utc>) -> Self {
        Self {
            updated_at,
            ..self.clone()
        }
    }

    /// Copy with a new expiry.
    #[must_use]
    pub fn with_expires_at(&self, expires_at: DateTime<Utc>) -> Self {
        Self {
            expires_at,
            ..self.clone()
        }
    }

    /// Whether the session is no longer valid at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the session has not been refreshed within `ttl` of `now`.
    pub fn is_inactive_at(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        self.updated_at
            .checked_add_signed(ttl)
            .is_some_and(|deadline| deadline < now)
    }

    /// Whether the session is owned by `identifier`.
    pub fn belongs_to(&self, identifier: &str) -> bool {
        self.identifier == identifier
    }
}

/// Combine an authoritative session list with the locally tracked one.
///
/// Entries of `active` win, except that an entry also present in `main`
/// takes its expiry from `main`. Entries only in `main` pass through.
pub fn combine_sessions(mut main: SessionMap, active: SessionMap) -> SessionMap {
    for (id, session) in active {
        let merged = match main.get(&id) {
            Some(authoritative) => session.with_expires_at(authoritative.expires_at),
            None => session,
        };
        main.insert(id, merged);
    }
    main
}

/// Drop every session that is expired at `now`.
pub fn retain_live(sessions: SessionMap, now: DateTime<Utc>) -> SessionMap {
    sessions
        .into_iter()
        .filter(|(_, s)| !s.is_expired_at(now))
        .collect()
}

/// Index a list of sessions by id. Later duplicates replace earlier ones.
pub fn index_sessions(sessions: impl IntoIterator<Item = Session>) -> SessionMap {
    sessions.into_iter().map(|s| (s.id.clone(), s)).collect()
}

/// Parse a timestamp from its textual form.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(secs) = raw.parse::<i64>() {
        return from_unix_seconds(secs);
    }
    Err(Error::InvalidTimestamp(raw.to_string()))
}

/// Convert Unix seconds into a timestamp.
pub fn from_unix_seconds(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| Error::InvalidTimestamp(secs.to_string()))
}

mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(i64),
        Text(String),
    }

    pub(super) fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let parsed = match Raw::deserialize(d)? {
            Raw::Seconds(secs) => super::from_unix_seconds(secs),
            Raw::Text(text) => super::parse_timestamp(&text),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}
