//! Mock HTTP transport for tests.
//!
//! Scripted per-URL responses plus request recording, so tests can drive
//! the client without network access. Stream responses are delivered as a
//! fixed chunk sequence, which makes chunk-boundary behavior easy to pin
//! down.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response};

/// A recorded request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: Option<String>,
}

/// What the mock should answer with for a URL.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// A buffered response (for `get`/`post`)
    Success(Response),
    /// A transport error
    Error(HttpError),
    /// A streaming body delivered as these chunks, then end-of-stream
    Stream(Vec<Bytes>),
    /// Chunks, then a mid-stream read error
    StreamThenError(Vec<Bytes>, HttpError),
    /// A stream that never yields (for cancellation tests)
    Hang,
}

/// Scripted [`HttpClient`] implementation.
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response for an exact URL.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    /// All requests made so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, method: &str, url: &str, headers: &Headers, body: Option<String>) {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
            body,
        });
    }

    fn lookup(&self, url: &str) -> Option<MockResponse> {
        self.responses.lock().unwrap().get(url).cloned()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record("POST", url, headers, Some(body.to_string()));
        match self.lookup(url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) => Err(err),
            Some(other) => Err(HttpError::Other(format!(
                "mock for {url} is not a buffered response: {other:?}"
            ))),
            None => Err(HttpError::Other(format!("no mock response for {url}"))),
        }
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError> {
        self.record("POST", url, headers, Some(body.to_string()));
        match self.lookup(url) {
            Some(MockResponse::Stream(chunks)) => {
                let items: Vec<Result<Bytes, HttpError>> = chunks.into_iter().map(Ok).collect();
                Ok(Box::pin(stream::iter(items)))
            }
            Some(MockResponse::StreamThenError(chunks, err)) => {
                let mut items: Vec<Result<Bytes, HttpError>> =
                    chunks.into_iter().map(Ok).collect();
                items.push(Err(err));
                Ok(Box::pin(stream::iter(items)))
            }
            Some(MockResponse::Hang) => {
                let hang: ByteStream = Box::pin(stream::pending());
                Ok(hang)
            }
            Some(MockResponse::Error(err)) => Err(err),
            Some(MockResponse::Success(response)) => Err(HttpError::Other(format!(
                "mock for {url} is buffered, not a stream: status {}",
                response.status
            ))),
            None => Err(HttpError::Other(format!("no mock response for {url}"))),
        }
    }
}
