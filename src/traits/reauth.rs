//! Re-authentication signal trait abstraction.
//!
//! When the backend rejects a request with 401/403 the client does not
//! surface a generic error; it notifies this collaborator instead, so a
//! single re-auth flow (login redirect, token refresh, user prompt) can be
//! driven from one place even with several streams in flight.

/// Receives auth-rejection notifications from the client.
///
/// Implementations must be safe to invoke redundantly from multiple
/// concurrent streams; any cooldown/dedup policy is the implementation's
/// concern, not the client's. The client holds no retry state of its own.
pub trait AuthFailureHandler: Send + Sync {
    /// Called when the backend rejects the credential (401/403) or the
    /// credential was missing and the caller asked for re-auth handling.
    fn on_auth_failure(&self, reason: &str);
}

/// A handler that ignores auth failures. Useful for one-shot tools and
/// tests that assert no re-auth path is taken.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreAuthFailures;

impl AuthFailureHandler for IgnoreAuthFailures {
    fn on_auth_failure(&self, _reason: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn ignore_handler_is_a_no_op() {
        IgnoreAuthFailures.on_auth_failure("expired");
    }

    #[test]
    fn handler_can_count_invocations() {
        struct Counting(AtomicUsize);

        impl AuthFailureHandler for Counting {
            fn on_auth_failure(&self, _reason: &str) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let handler = Counting(AtomicUsize::new(0));
        handler.on_auth_failure("401");
        handler.on_auth_failure("403");
        assert_eq!(handler.0.load(Ordering::SeqCst), 2);
    }
}
