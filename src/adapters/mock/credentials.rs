//! Mock credential provider for tests.

use std::sync::Mutex;

use crate::traits::CredentialProvider;

/// A credential provider holding a fixed (swappable) token.
#[derive(Debug, Default)]
pub struct StaticCredentials {
    token: Mutex<Option<String>>,
}

impl StaticCredentials {
    /// Provider that always returns `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    /// Provider with no credential at all.
    pub fn absent() -> Self {
        Self::default()
    }

    /// Replace the stored token (e.g. to simulate a refresh or logout).
    pub fn set_token(&self, token: Option<String>) {
        *self.token.lock().unwrap() = token;
    }
}

impl CredentialProvider for StaticCredentials {
    fn bearer_token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }
}
