//! Mock collaborator implementations for tests.

mod credentials;
mod http;
mod reauth;

pub use credentials::StaticCredentials;
pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use reauth::RecordingAuthHandler;
