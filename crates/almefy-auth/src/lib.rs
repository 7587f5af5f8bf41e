//! Almefy authentication for web applications.
//!
//! Framework-agnostic building blocks for passwordless login with Almefy:
//!
//! - [`authenticator`]: verifies login tokens and registers the new session
//! - [`provider`]: loads users and refreshes their session on each request
//! - [`entry_point`]: redirects unauthenticated visitors to the login page
//! - [`bundle`]: builds all of the above from an [`almefy_config::AlmefyConfig`]
//!
//! The host application supplies an [`AlmefyClient`] for the Almefy API, a
//! [`RequestSession`] for its per-visitor session, and a cache store shared
//! by all of its instances.

pub mod authenticator;
pub mod bundle;
pub mod client;
pub mod entry_point;
pub mod error;
pub mod identity;
pub mod provider;
pub mod request;

#[cfg(test)]
mod testing;

pub use authenticator::{AUTH_HEADER, AlmefyAuthenticator, Authentication, TokenDetails, inspect_token};
pub use bundle::{AlmefyServices, session_config};
pub use client::{AlmefyClient, AuthenticationChallenge, ClientSessionSource, SharedAlmefyClient};
pub use entry_point::{AuthenticationEntryPoint, LOGIN_REQUIRED_NOTE, Redirect};
pub use error::{AuthError, ClientError, Result};
pub use identity::{AlmefyUserIdentity, Identity, ROLE_ALMEFY_USER};
pub use provider::AlmefyUserIdentityProvider;
pub use request::{MemoryRequestSession, RequestSession, SESSION_ID_ATTRIBUTE};
