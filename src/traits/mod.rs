//! Trait abstractions for external collaborators.
//!
//! The streaming core depends on three seams: the HTTP transport, the
//! credential source, and the re-authentication signal. Production
//! implementations live in [`crate::adapters`]; tests inject mocks.

mod credentials;
mod http;
mod reauth;

pub use credentials::CredentialProvider;
pub use http::{ByteStream, Headers, HttpClient, HttpError, Response};
pub use reauth::{AuthFailureHandler, IgnoreAuthFailures};
