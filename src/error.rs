//! Client error taxonomy.
//!
//! What is *not* here is as deliberate as what is: a malformed stream
//! record is swallowed by the decoder (the stream continues), an in-band
//! server `error` record is delivered as a [`StreamEvent::StreamError`]
//! event, and caller-initiated cancellation produces no error at all.
//!
//! [`StreamEvent::StreamError`]: crate::sse::StreamEvent::StreamError

use thiserror::Error;

use crate::traits::HttpError;

/// Errors reported by [`ChatClient`](crate::api::ChatClient), either
/// through the `on_error` callback (streaming) or as `Err` (blocking).
#[derive(Debug, Error)]
pub enum Error {
    /// No bearer token was available; no network call was made.
    #[error("not authenticated: no bearer token available")]
    Unauthenticated,

    /// The request failed a local precondition; no network call was made.
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    /// The backend rejected the credential (401/403). The re-auth handler
    /// has already been notified; callers should not start a second
    /// re-auth flow.
    #[error("authentication rejected by server (status {status})")]
    AuthRejected { status: u16 },

    /// Network or connection failure.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Non-auth HTTP error status, with the error body parsed best-effort.
    #[error("server returned status {status}: {message}")]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A non-streaming response body failed to deserialize.
    #[error("failed to decode response body: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::AuthRejected { status } => Some(*status),
            Error::Status { status, .. } => Some(*status),
            Error::Http(err) => err.status(),
            _ => None,
        }
    }

    /// Whether this error means the caller must (re)authenticate.
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Unauthenticated | Error::AuthRejected { .. })
    }
}
