//! Wires the authentication services from configuration.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use almefy_config::{AlmefyConfig, SessionSection};
use almefy_session::{SessionConfig, SessionManager, SharedCacheStore};

use crate::authenticator::AlmefyAuthenticator;
use crate::client::{ClientSessionSource, SharedAlmefyClient};
use crate::entry_point::AuthenticationEntryPoint;
use crate::error::{AuthError, Result};
use crate::provider::AlmefyUserIdentityProvider;

/// Everything a host application needs to authenticate Almefy users.
#[derive(Debug, Clone)]
pub struct AlmefyServices {
    pub sessions: SessionManager,
    pub authenticator: AlmefyAuthenticator,
    pub provider: AlmefyUserIdentityProvider,
    pub entry_point: AuthenticationEntryPoint,
}

impl AlmefyServices {
    /// Build the services sharing one session manager on `store`.
    pub fn from_config(
        config: &AlmefyConfig,
        client: SharedAlmefyClient,
        store: SharedCacheStore,
    ) -> Result<Self> {
        config.validate()?;

        let secret = config
            .api
            .as_ref()
            .and_then(|api| api.secret.as_deref())
            .ok_or_else(|| AuthError::Configuration("API secret is not configured".to_string()))?;
        let security = config.security_or_default();

        let sessions = SessionManager::new(
            session_config(&config.session_or_default()),
            Arc::new(ClientSessionSource::new(client.clone())),
            store,
        );

        let authenticator = AlmefyAuthenticator::new(
            client.clone(),
            sessions.clone(),
            secret,
            security.authenticate_path.clone(),
        )?;

        info!(
            api = %client.api(),
            authenticate_path = %security.authenticate_path,
            "Almefy authentication configured"
        );

        Ok(Self {
            provider: AlmefyUserIdentityProvider::new(client, sessions.clone()),
            entry_point: AuthenticationEntryPoint::new(security.login_path),
            authenticator,
            sessions,
        })
    }
}

/// Session manager settings from the `[session]` section.
pub fn session_config(section: &SessionSection) -> SessionConfig {
    SessionConfig::new()
        .with_session_ttl(Duration::from_secs(section.ttl_secs))
        .with_session_cache_ttl(Duration::from_secs(section.cache_ttl_secs))
        .with_max_update_attempts(section.max_update_attempts)
}
