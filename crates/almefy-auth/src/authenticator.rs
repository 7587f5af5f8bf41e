//! Login token authentication.
//!
//! The Almefy app answers a login challenge by posting a signed token to
//! the authenticate path in the `X-Almefy-Auth` header. Authentication:
//! 1. decodes the token without verifying it, to learn who it claims to be
//! 2. redeems the challenge with the Almefy API, which returns a new session
//! 3. verifies issuer, audience, subject, timestamps and the signature
//! 4. records the session in the request session and the session caches
//!
//! The decoded header and claims come back with the user so the host can
//! inspect them after login. On failure they are available from
//! [`inspect_token`].

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation, decode, decode_header};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use almefy_session::{Session, SessionId, SessionManager};

use crate::client::{AuthenticationChallenge, SharedAlmefyClient};
use crate::error::{AuthError, Result};
use crate::identity::AlmefyUserIdentity;
use crate::request::{RequestSession, SESSION_ID_ATTRIBUTE};

/// Header carrying the login token.
pub const AUTH_HEADER: &str = "X-Almefy-Auth";

/// Allowed clock skew for token timestamps, in seconds.
const REQUEST_TIMESTAMP_LEEWAY: u64 = 60;

#[derive(Debug, Deserialize)]
struct TokenClaims {
    sub: String,
    jti: String,
    otp: String,
    #[serde(default)]
    iat: Option<i64>,
}

/// Header and claims of a login token, decoded without verification.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenDetails {
    pub header: Header,
    pub claims: Map<String, Value>,
}

impl TokenDetails {
    /// Look up a single claim.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    fn challenge_claims(&self) -> Result<TokenClaims> {
        serde_json::from_value(Value::Object(self.claims.clone()))
            .map_err(|e| AuthError::MalformedToken(e.to_string()))
    }
}

/// A completed login.
#[derive(Debug, Clone)]
pub struct Authentication {
    pub user: AlmefyUserIdentity,
    /// Almefy session created by the login.
    pub session_id: SessionId,
    pub token: TokenDetails,
}

/// Authenticates users from Almefy login tokens.
#[derive(Clone)]
pub struct AlmefyAuthenticator {
    client: SharedAlmefyClient,
    sessions: SessionManager,
    key: DecodingKey,
    authenticate_path: String,
}

impl std::fmt::Debug for AlmefyAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlmefyAuthenticator")
            .field("client", &self.client)
            .field("authenticate_path", &self.authenticate_path)
            .finish_non_exhaustive()
    }
}

impl AlmefyAuthenticator {
    /// Create an authenticator verifying tokens with the base64-encoded
    /// `api_secret`.
    pub fn new(
        client: SharedAlmefyClient,
        sessions: SessionManager,
        api_secret: &str,
        authenticate_path: impl Into<String>,
    ) -> Result<Self> {
        let key = DecodingKey::from_base64_secret(api_secret)
            .map_err(|e| AuthError::Configuration(format!("API secret is not valid base64: {e}")))?;

        Ok(Self {
            client,
            sessions,
            key,
            authenticate_path: authenticate_path.into(),
        })
    }

    /// Whether a request should be handled by this authenticator.
    ///
    /// `auth_header` is the value of [`AUTH_HEADER`], if present.
    pub fn supports(&self, path: &str, auth_header: Option<&str>) -> bool {
        auth_header.is_some() && path == self.authenticate_path
    }

    /// Authenticate the holder of `token` and register their new session.
    pub async fn authenticate(
        &self,
        token: &str,
        request_session: &dyn RequestSession,
    ) -> Result<Authentication> {
        let details = inspect_token(token)?;
        let claims = details.challenge_claims()?;
        debug!(identifier = %claims.sub, "Authenticating Almefy login token");

        let identity = self.client.get_identity(&claims.sub).await?;
        let user = AlmefyUserIdentity::from_identity(identity);

        let challenge = AuthenticationChallenge {
            challenge: claims.jti,
            identifier: claims.sub.clone(),
            otp: claims.otp,
        };
        let Some(record) = self.client.authenticate(&challenge).await? else {
            warn!(identifier = %claims.sub, "Almefy challenge refused");
            return Err(AuthError::AccessDenied(claims.sub));
        };

        self.verify(token, user.identifier())?;

        let session = Session::from_value(record)?;
        request_session.set(SESSION_ID_ATTRIBUTE, session.id.to_string());
        let session_id = session.id.clone();
        self.sessions.add_session(session).await?;

        info!(
            identifier = %user.identifier(),
            session_id = %session_id,
            "Almefy user authenticated"
        );
        Ok(Authentication {
            user,
            session_id,
            token: details,
        })
    }

    /// Verify issuer, audience, subject, timestamps and signature.
    fn verify(&self, token: &str, identifier: &str) -> Result<()> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = REQUEST_TIMESTAMP_LEEWAY;
        validation.validate_nbf = true;
        validation.set_issuer(&[self.client.api()]);
        validation.set_audience(&[self.client.key()]);
        validation.sub = Some(identifier.to_string());
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);

        let data = decode::<TokenClaims>(token, &self.key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let latest = Utc::now().timestamp() + REQUEST_TIMESTAMP_LEEWAY as i64;
        match data.claims.iat {
            Some(iat) if iat <= latest => Ok(()),
            Some(_) => Err(AuthError::InvalidToken(
                "token issued in the future".to_string(),
            )),
            None => Err(AuthError::InvalidToken("missing iat claim".to_string())),
        }
    }
}

/// Decode a login token's header and claims without checking the signature
/// or timestamps.
pub fn inspect_token(token: &str) -> Result<TokenDetails> {
    let header = decode_header(token).map_err(|e| AuthError::MalformedToken(e.to_string()))?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let claims = decode::<Map<String, Value>>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::MalformedToken(e.to_string()))?;

    Ok(TokenDetails { header, claims })
}
