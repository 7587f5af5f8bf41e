//! Almefy identities and the user record built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role granted to every Almefy-authenticated user.
pub const ROLE_ALMEFY_USER: &str = "ROLE_ALMEFY_USER";

/// Identity record as returned by the Almefy API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Uuid,
    pub identifier: String,
    #[serde(default)]
    pub locked: bool,
    /// Enrolled device tokens; opaque here.
    #[serde(default)]
    pub tokens: Vec<serde_json::Value>,
}

/// An authenticated application user backed by an Almefy identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlmefyUserIdentity {
    id: Uuid,
    identifier: String,
    locked: bool,
    roles: Vec<String>,
    tokens: Vec<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl AlmefyUserIdentity {
    /// Create a user with a fresh id.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            identifier: identifier.into(),
            locked: false,
            roles: vec![ROLE_ALMEFY_USER.to_string()],
            tokens: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Build the user for an identity returned by the API.
    pub fn from_identity(identity: Identity) -> Self {
        Self {
            id: identity.id,
            locked: identity.locked,
            tokens: identity.tokens,
            ..Self::new(identity.identifier)
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The identifier users log in with (usually an email address).
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn tokens(&self) -> &[serde_json::Value] {
        &self.tokens
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}
