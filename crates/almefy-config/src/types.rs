//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [api]        # Almefy API endpoint and credentials
//! [session]    # session cache timing
//! [security]   # login and authentication paths
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default Almefy API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.almefy.com";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlmefyConfig {
    /// Almefy API endpoint and credentials.
    pub api: Option<ApiConfig>,

    /// Session cache timing.
    pub session: Option<SessionSection>,

    /// Login and authentication paths.
    pub security: Option<SecuritySection>,
}

impl AlmefyConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: AlmefyConfig) {
        if other.api.is_some() {
            self.api = other.api;
        }

        if other.session.is_some() {
            self.session = other.session;
        }

        if other.security.is_some() {
            self.security = other.security;
        }
    }

    /// Session section, or defaults when absent.
    pub fn session_or_default(&self) -> SessionSection {
        self.session.clone().unwrap_or_default()
    }

    /// Security section, or defaults when absent.
    pub fn security_or_default(&self) -> SecuritySection {
        self.security.clone().unwrap_or_default()
    }

    /// Check that the config is complete enough to authenticate requests.
    pub fn validate(&self) -> Result<()> {
        let api = self
            .api
            .as_ref()
            .ok_or_else(|| ConfigError::missing("api", "config"))?;
        api.validate()?;
        self.session_or_default().validate()?;
        self.security_or_default().validate()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API
// ─────────────────────────────────────────────────────────────────────────────

/// Almefy API endpoint and credentials.
///
/// ```toml
/// [api]
/// url = "https://api.almefy.com"
/// key = "a1b2c3"
/// # secret is better supplied via ALMEFY_API_SECRET
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API base URL; also the expected token issuer.
    pub url: String,

    /// API key; also the expected token audience.
    pub key: Option<String>,

    /// Base64-encoded secret used to verify authentication tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            key: None,
            secret: None,
        }
    }
}

impl ApiConfig {
    /// Returns true if the secret is stored directly in the config file.
    pub fn has_plaintext_secret(&self) -> bool {
        self.secret.is_some()
    }

    fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::missing("url", "[api]"));
        }
        if self.key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            return Err(ConfigError::missing("key", "[api]"));
        }
        if self.secret.as_deref().is_none_or(|s| s.trim().is_empty()) {
            return Err(ConfigError::missing(
                "secret",
                "[api] (or the ALMEFY_API_SECRET environment variable)",
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Session cache timing.
///
/// ```toml
/// [session]
/// ttl_secs = 360
/// cache_ttl_secs = 15
/// max_update_attempts = 8
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Inactivity timeout for a session, in seconds.
    pub ttl_secs: u64,

    /// Lifetime of the cached authoritative session list, in seconds.
    pub cache_ttl_secs: u64,

    /// Compare-and-set attempts per session list update.
    pub max_update_attempts: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            ttl_secs: 360,
            cache_ttl_secs: 15,
            max_update_attempts: 8,
        }
    }
}

impl SessionSection {
    fn validate(&self) -> Result<()> {
        if self.ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "[session] ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "[session] cache_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_update_attempts == 0 {
            return Err(ConfigError::Invalid(
                "[session] max_update_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Security
// ─────────────────────────────────────────────────────────────────────────────

/// Login and authentication paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    /// Where unauthenticated users are redirected.
    pub login_path: String,

    /// Path that accepts Almefy authentication tokens.
    pub authenticate_path: String,
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            authenticate_path: "/almefy/authenticate".to_string(),
        }
    }
}

impl SecuritySection {
    fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("login_path", &self.login_path),
            ("authenticate_path", &self.authenticate_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "[security] {name} must start with '/', got '{path}'"
                )));
            }
        }
        Ok(())
    }
}
