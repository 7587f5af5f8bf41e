//! Sends unauthenticated visitors to the login page.

use crate::request::RequestSession;

/// Flash message shown on the login page after a redirect.
pub const LOGIN_REQUIRED_NOTE: &str = "You have to login in order to access this page.";

/// A redirect the host framework should send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
}

#[derive(Debug, Clone)]
pub struct AuthenticationEntryPoint {
    login_path: String,
}

impl AuthenticationEntryPoint {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }

    /// Leave a note for the login page and redirect there.
    pub fn start(&self, request_session: &dyn RequestSession) -> Redirect {
        request_session.add_flash("note", LOGIN_REQUIRED_NOTE);
        Redirect {
            location: self.login_path.clone(),
        }
    }
}
