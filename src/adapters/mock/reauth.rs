//! Mock re-authentication handler for tests.

use std::sync::{Arc, Mutex};

use crate::traits::AuthFailureHandler;

/// Records every auth-failure notification it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingAuthHandler {
    reasons: Arc<Mutex<Vec<String>>>,
}

impl RecordingAuthHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the handler has been invoked.
    pub fn call_count(&self) -> usize {
        self.reasons.lock().unwrap().len()
    }

    /// The reasons passed so far, in order.
    pub fn reasons(&self) -> Vec<String> {
        self.reasons.lock().unwrap().clone()
    }
}

impl AuthFailureHandler for RecordingAuthHandler {
    fn on_auth_failure(&self, reason: &str) {
        self.reasons.lock().unwrap().push(reason.to_string());
    }
}
