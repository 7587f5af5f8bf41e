//! Per-visitor session storage of the host web framework.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Request session attribute holding the Almefy session id.
pub const SESSION_ID_ATTRIBUTE: &str = "almefy_session_id";

/// The host framework's per-visitor session (cookie session, etc.).
pub trait RequestSession: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String);

    /// Queue a one-time message for the next rendered page.
    fn add_flash(&self, kind: &str, message: &str);
}

/// In-memory request session.
#[derive(Debug, Default)]
pub struct MemoryRequestSession {
    values: Mutex<HashMap<String, String>>,
    flashes: Mutex<Vec<(String, String)>>,
}

impl MemoryRequestSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return queued flash messages as `(kind, message)` pairs.
    pub fn take_flashes(&self) -> Vec<(String, String)> {
        std::mem::take(&mut *self.flashes.lock())
    }
}

impl RequestSession for MemoryRequestSession {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.values.lock().insert(key.to_string(), value);
    }

    fn add_flash(&self, kind: &str, message: &str) {
        self.flashes
            .lock()
            .push((kind.to_string(), message.to_string()));
    }
}
