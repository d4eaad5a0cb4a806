//! Reqwest-based HTTP transport.
//!
//! Production implementation of the [`HttpClient`] trait. Streaming
//! responses are handed back as a chunk stream only after the status line
//! has been classified as success; error bodies are buffered so the
//! caller can parse them.

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response};

/// [`HttpClient`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a client with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a pre-configured `reqwest::Client` (timeouts, proxies, TLS).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn classify(err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout(err.to_string())
        } else if err.is_connect() {
            HttpError::ConnectionFailed(err.to_string())
        } else if err.is_builder() {
            HttpError::InvalidUrl(err.to_string())
        } else {
            HttpError::Other(err.to_string())
        }
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: &str,
        headers: &Headers,
    ) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, url);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        builder
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        let response = self
            .request(reqwest::Method::POST, url, headers)
            .body(body.to_string())
            .send()
            .await
            .map_err(Self::classify)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(Self::classify)?;
        Ok(Response::new(status, body))
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError> {
        let response = self
            .request(reqwest::Method::POST, url, headers)
            .body(body.to_string())
            .send()
            .await
            .map_err(Self::classify)?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpError::Status { status, body });
        }

        let stream = response.bytes_stream().map(|item| {
            item.map_err(|err| {
                if err.is_timeout() {
                    HttpError::Timeout(err.to_string())
                } else {
                    HttpError::Read(err.to_string())
                }
            })
        });

        Ok(Box::pin(stream))
    }
}
