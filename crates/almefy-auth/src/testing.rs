//! Test doubles shared by this crate's tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use parking_lot::Mutex;
use serde_json::{Value, json};
use uuid::Uuid;

use almefy_session::{MemoryStore, SessionConfig, SessionId, SessionManager};

use crate::client::{AlmefyClient, AuthenticationChallenge, ClientSessionSource};
use crate::error::ClientError;
use crate::identity::Identity;

pub(crate) const API: &str = "https://api.almefy.test";
pub(crate) const KEY: &str = "key-1";
/// base64 of "secret-key-for-tests"
pub(crate) const SECRET: &str = "c2VjcmV0LWtleS1mb3ItdGVzdHM=";
pub(crate) const USER: &str = "jane@example.com";

#[derive(Debug, Default)]
pub(crate) struct MockClient {
    pub identities: Mutex<HashMap<String, Identity>>,
    /// Returned by `authenticate`; `None` refuses the challenge.
    pub grant: Mutex<Option<Value>>,
    pub challenges: Mutex<Vec<AuthenticationChallenge>>,
    pub sessions: Mutex<Vec<Value>>,
}

impl MockClient {
    /// Client that knows [`USER`] and grants session `s1` to it.
    pub fn granting() -> Arc<Self> {
        let client = Self::default();
        client.identities.lock().insert(
            USER.to_string(),
            Identity {
                id: Uuid::new_v4(),
                identifier: USER.to_string(),
                locked: false,
                tokens: Vec::new(),
            },
        );
        *client.grant.lock() = Some(session_record("s1", USER));
        Arc::new(client)
    }
}

#[async_trait]
impl AlmefyClient for MockClient {
    fn api(&self) -> &str {
        API
    }

    fn key(&self) -> &str {
        KEY
    }

    async fn get_identity(&self, identifier: &str) -> Result<Identity, ClientError> {
        self.identities
            .lock()
            .get(identifier)
            .cloned()
            .ok_or_else(|| ClientError(format!("identity not found: {identifier}")))
    }

    async fn authenticate(
        &self,
        challenge: &AuthenticationChallenge,
    ) -> Result<Option<Value>, ClientError> {
        self.challenges.lock().push(challenge.clone());
        Ok(self.grant.lock().clone())
    }

    async fn get_sessions(&self, ids: &[SessionId]) -> Result<Vec<Value>, ClientError> {
        Ok(self
            .sessions
            .lock()
            .iter()
            .filter(|s| ids.iter().any(|id| s["id"] == id.as_str()))
            .cloned()
            .collect())
    }
}

/// Session record as the API returns it, valid for an hour.
pub(crate) fn session_record(id: &str, identifier: &str) -> Value {
    let now = Utc::now();
    json!({
        "id": id,
        "identifier": identifier,
        "expiresAt": (now + Duration::hours(1)).to_rfc3339(),
        "updatedAt": now.to_rfc3339(),
    })
}

/// Claims of a valid login token for `sub`.
pub(crate) fn claims(sub: &str) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "iss": API,
        "aud": KEY,
        "sub": sub,
        "jti": "challenge-1",
        "otp": "123456",
        "iat": now,
        "nbf": now,
        "exp": now + 300,
    })
}

pub(crate) fn mint(claims: &Value) -> String {
    mint_with(claims, SECRET)
}

pub(crate) fn mint_with(claims: &Value, secret: &str) -> String {
    let key = EncodingKey::from_base64_secret(secret).unwrap();
    encode(&Header::new(Algorithm::HS256), claims, &key).unwrap()
}

pub(crate) fn manager(client: Arc<MockClient>) -> (SessionManager, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let manager = SessionManager::new(
        SessionConfig::default(),
        Arc::new(ClientSessionSource::new(client)),
        store.clone(),
    );
    (manager, store)
}
