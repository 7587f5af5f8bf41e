//! Error types for Almefy authentication.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Failure reported by an Almefy API client.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Almefy API error: {0}")]
pub struct ClientError(pub String);

/// Errors that can occur while authenticating or refreshing a user.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token could not be decoded at all.
    #[error("Malformed authentication token: {0}")]
    MalformedToken(String),

    /// The token decoded but failed validation.
    #[error("Invalid authentication token: {0}")]
    InvalidToken(String),

    /// The Almefy API refused the authentication challenge.
    #[error("Access denied for user: {0}")]
    AccessDenied(String),

    /// The request session carries no Almefy session id.
    #[error("No Almefy session id in the request session")]
    MissingSession,

    /// Error from the Almefy API client.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Configuration is incomplete or unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from session coordination.
    #[error("Session error: {0}")]
    Session(#[from] almefy_session::Error),
}

impl AuthError {
    /// Whether the user has to log in again.
    pub fn requires_login(&self) -> bool {
        match self {
            AuthError::MalformedToken(_)
            | AuthError::InvalidToken(_)
            | AuthError::AccessDenied(_)
            | AuthError::MissingSession => true,
            AuthError::Session(e) => e.is_access_denied(),
            AuthError::Client(_) | AuthError::Configuration(_) => false,
        }
    }
}

impl From<almefy_config::ConfigError> for AuthError {
    fn from(e: almefy_config::ConfigError) -> Self {
        AuthError::Configuration(e.to_string())
    }
}
