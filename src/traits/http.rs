//! HTTP transport trait abstraction.
//!
//! The chat client talks to the backend exclusively through this seam,
//! enabling dependency injection and mocking in tests. The production
//! implementation lives in [`crate::adapters::ReqwestHttpClient`].

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;

/// HTTP headers represented as a key-value map.
pub type Headers = HashMap<String, String>;

/// A boxed stream of raw response-body chunks.
///
/// Returned by [`HttpClient::post_stream`]; the decode loop pulls chunks
/// from it one at a time.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// A fully-buffered HTTP response (non-streaming calls).
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Bytes,
}

impl Response {
    /// Create a new response.
    pub fn new(status: u16, body: Bytes) -> Self {
        Self { status, body }
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get the response body as a string (lossy on invalid UTF-8).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the response body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Transport-level errors.
#[derive(Debug, Clone)]
pub enum HttpError {
    /// Connection could not be established
    ConnectionFailed(String),
    /// Request timed out
    Timeout(String),
    /// Server rejected the request before any body streaming began.
    /// `body` is the raw (possibly JSON) error body text.
    Status { status: u16, body: String },
    /// Error while reading the response body stream
    Read(String),
    /// Invalid URL
    InvalidUrl(String),
    /// Anything else the transport reports
    Other(String),
}

impl HttpError {
    /// The HTTP status code, for `Status` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::ConnectionFailed(msg) => write!(f, "connection failed: {}", msg),
            HttpError::Timeout(msg) => write!(f, "request timed out: {}", msg),
            HttpError::Status { status, body } => write!(f, "server returned {}: {}", status, body),
            HttpError::Read(msg) => write!(f, "stream read error: {}", msg),
            HttpError::InvalidUrl(msg) => write!(f, "invalid URL: {}", msg),
            HttpError::Other(msg) => write!(f, "transport error: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

/// Trait for HTTP operations against the chat backend.
///
/// Implementations must be `Send + Sync` so one client can serve multiple
/// concurrent streams.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a POST request and buffer the full response.
    ///
    /// Non-2xx statuses are returned as a normal [`Response`] so the caller
    /// can classify them (auth vs. generic failure).
    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError>;

    /// Perform a POST request and return the response body as a chunk
    /// stream.
    ///
    /// Implementations must inspect the status line before handing back the
    /// stream: a non-2xx response is reported as [`HttpError::Status`] with
    /// the buffered body text, and no stream is returned.
    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_is_success_bounds() {
        assert!(Response::new(200, Bytes::new()).is_success());
        assert!(Response::new(299, Bytes::new()).is_success());
        assert!(!Response::new(199, Bytes::new()).is_success());
        assert!(!Response::new(300, Bytes::new()).is_success());
        assert!(!Response::new(403, Bytes::new()).is_success());
    }

    #[test]
    fn response_text_and_json() {
        let resp = Response::new(200, Bytes::from(r#"{"answer":"hi"}"#));
        assert_eq!(resp.text(), r#"{"answer":"hi"}"#);

        let value: serde_json::Value = resp.json().unwrap();
        assert_eq!(value["answer"], "hi");
    }

    #[test]
    fn status_error_exposes_code() {
        let err = HttpError::Status {
            status: 404,
            body: "not found".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("404"));

        assert_eq!(HttpError::Timeout("30s".to_string()).status(), None);
    }

    #[test]
    fn display_formats() {
        assert_eq!(
            HttpError::ConnectionFailed("refused".to_string()).to_string(),
            "connection failed: refused"
        );
        assert_eq!(
            HttpError::Read("reset by peer".to_string()).to_string(),
            "stream read error: reset by peer"
        );
    }
}
