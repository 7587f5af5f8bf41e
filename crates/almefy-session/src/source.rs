//! The remote source of authoritative session records.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::session::{Session, SessionId};

/// Returns the current server-side records for a set of session ids.
///
/// Implemented by the Almefy API client. Errors should be reported as
/// [`crate::Error::Source`].
#[async_trait]
pub trait SessionSource: Send + Sync + std::fmt::Debug {
    async fn get_sessions(&self, ids: &[SessionId]) -> Result<Vec<Session>>;
}

/// Shared session source handle.
pub type SharedSessionSource = Arc<dyn SessionSource>;
