//! Loads users from the Almefy API and keeps their sessions alive.

use tracing::debug;

use almefy_session::{SessionId, SessionManager};

use crate::client::SharedAlmefyClient;
use crate::error::{AuthError, Result};
use crate::identity::AlmefyUserIdentity;
use crate::request::{RequestSession, SESSION_ID_ATTRIBUTE};

#[derive(Debug, Clone)]
pub struct AlmefyUserIdentityProvider {
    client: SharedAlmefyClient,
    sessions: SessionManager,
}

impl AlmefyUserIdentityProvider {
    pub fn new(client: SharedAlmefyClient, sessions: SessionManager) -> Self {
        Self { client, sessions }
    }

    pub async fn load_user_by_identifier(&self, identifier: &str) -> Result<AlmefyUserIdentity> {
        let identity = self.client.get_identity(identifier).await?;
        Ok(AlmefyUserIdentity::from_identity(identity))
    }

    /// Re-validate a logged-in user on a new request.
    ///
    /// With a request session, the Almefy session recorded in it is
    /// refreshed; an unknown, expired or foreign session fails with an
    /// access-denied session error. Without one there is nothing to check.
    pub async fn refresh_user(
        &self,
        user: &AlmefyUserIdentity,
        request_session: Option<&dyn RequestSession>,
    ) -> Result<AlmefyUserIdentity> {
        if let Some(request_session) = request_session {
            let raw = request_session
                .get(SESSION_ID_ATTRIBUTE)
                .ok_or(AuthError::MissingSession)?;
            let session_id = SessionId::parse(raw).map_err(|_| AuthError::MissingSession)?;

            self.sessions
                .refresh_session_by_identifier(&session_id, user.identifier())
                .await?;
            debug!(identifier = %user.identifier(), session_id = %session_id, "User refreshed");
        }

        Ok(user.clone())
    }
}
