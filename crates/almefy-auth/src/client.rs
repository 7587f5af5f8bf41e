//! The Almefy API as seen by the authentication layer.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use almefy_session::{Session, SessionId, SessionSource};

use crate::error::ClientError;
use crate::identity::Identity;

/// Answer to a login challenge, taken from the token's `jti`, `sub` and
/// `otp` claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationChallenge {
    pub challenge: String,
    pub identifier: String,
    pub otp: String,
}

/// Almefy API client.
///
/// Implementations own the HTTP transport and request signing.
#[async_trait]
pub trait AlmefyClient: Send + Sync + std::fmt::Debug {
    /// Base URL of the API; tokens must be issued by it.
    fn api(&self) -> &str;

    /// API key; tokens must be addressed to it.
    fn key(&self) -> &str;

    /// Look up the identity registered for `identifier`.
    async fn get_identity(&self, identifier: &str) -> Result<Identity, ClientError>;

    /// Submit a challenge answer. Returns the new session record, or `None`
    /// when the API refuses it.
    async fn authenticate(
        &self,
        challenge: &AuthenticationChallenge,
    ) -> Result<Option<serde_json::Value>, ClientError>;

    /// Current session records for the given ids.
    async fn get_sessions(&self, ids: &[SessionId]) -> Result<Vec<serde_json::Value>, ClientError>;
}

/// Shared client handle.
pub type SharedAlmefyClient = Arc<dyn AlmefyClient>;

/// Adapts an [`AlmefyClient`] into the session manager's session source.
#[derive(Debug, Clone)]
pub struct ClientSessionSource {
    client: SharedAlmefyClient,
}

impl ClientSessionSource {
    pub fn new(client: SharedAlmefyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SessionSource for ClientSessionSource {
    async fn get_sessions(&self, ids: &[SessionId]) -> almefy_session::Result<Vec<Session>> {
        let records = self
            .client
            .get_sessions(ids)
            .await
            .map_err(|e| almefy_session::Error::Source(e.to_string()))?;

        records.into_iter().map(Session::from_value).collect()
    }
}
