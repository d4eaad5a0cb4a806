//! Chat API client.
//!
//! [`ChatClient`] owns the request/response contract with the backend:
//! bearer-token injection, initial status classification, and the two
//! call paths - [`start_stream`](ChatClient::start_stream) (streaming,
//! callback-driven, cancellable) and
//! [`send_blocking`](ChatClient::send_blocking) (one buffered response).
//!
//! A 401/403 from the backend is routed to the injected
//! [`AuthFailureHandler`] instead of the caller's error channel, so
//! concurrent streams cannot each kick off their own re-auth flow.

use std::sync::Arc;

use futures::future::{AbortHandle, Abortable};
use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, error};

use crate::adapters::ReqwestHttpClient;
use crate::error::Error;
use crate::models::{ApiErrorBody, ChatCompletionResult, ChatRequest};
use crate::sse::{StreamDecoder, StreamEvent};
use crate::traits::{
    AuthFailureHandler, CredentialProvider, Headers, HttpClient, HttpError,
};

/// Cancellation handle for one in-flight stream.
///
/// Returned synchronously by [`ChatClient::start_stream`], before the
/// connection is established, so cancellation works even if the first
/// byte never arrives. Aborting is idempotent; the decode loop stops at
/// its next suspension point, the partial buffer is discarded, and no
/// error is reported for the cancellation.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    inner: Option<AbortHandle>,
}

impl StreamHandle {
    fn bound(handle: AbortHandle) -> Self {
        Self {
            inner: Some(handle),
        }
    }

    /// Handle for a stream that never started (precondition failures).
    fn detached() -> Self {
        Self { inner: None }
    }

    /// Request cancellation. Safe to call any number of times.
    pub fn abort(&self) {
        if let Some(handle) = &self.inner {
            handle.abort();
        }
    }
}

/// Client for the conversational backend.
///
/// Cheap to clone pieces: collaborators are shared via `Arc`, and every
/// [`start_stream`](Self::start_stream) call creates an independent
/// stream with its own decode state.
pub struct ChatClient {
    base_url: String,
    http: Arc<dyn HttpClient>,
    credentials: Arc<dyn CredentialProvider>,
    auth_failures: Arc<dyn AuthFailureHandler>,
}

impl ChatClient {
    /// Create a client against `base_url` with the production HTTP
    /// transport.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        auth_failures: Arc<dyn AuthFailureHandler>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            http: Arc::new(ReqwestHttpClient::new()),
            credentials,
            auth_failures,
        }
    }

    /// Swap the HTTP transport (tests, custom TLS/proxy setups).
    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = http;
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/chat-messages", self.base_url.trim_end_matches('/'))
    }

    /// Open a streaming chat exchange.
    ///
    /// Returns immediately with a [`StreamHandle`]; the request runs on a
    /// spawned task (requires a Tokio runtime). `on_event` fires once per
    /// decoded record, in arrival order. `on_error` fires at most once,
    /// and never for a caller-initiated abort or a 401/403 (the latter
    /// goes to the [`AuthFailureHandler`] instead).
    pub fn start_stream<F, E>(&self, request: ChatRequest, on_event: F, on_error: E) -> StreamHandle
    where
        F: FnMut(StreamEvent) + Send + 'static,
        E: FnOnce(Error) + Send + 'static,
    {
        if request.user.trim().is_empty() {
            on_error(Error::InvalidRequest("user must not be empty"));
            return StreamHandle::detached();
        }
        if request.query.trim().is_empty() {
            on_error(Error::InvalidRequest("query must not be empty"));
            return StreamHandle::detached();
        }

        let Some(token) = self.credentials.bearer_token() else {
            on_error(Error::Unauthenticated);
            return StreamHandle::detached();
        };

        let body = match request_body(&request, "streaming") {
            Ok(body) => body,
            Err(err) => {
                on_error(Error::Json(err));
                return StreamHandle::detached();
            }
        };

        let url = self.chat_url();
        let http = Arc::clone(&self.http);
        let auth_failures = Arc::clone(&self.auth_failures);

        let (abort_handle, registration) = AbortHandle::new_pair();
        let task = Abortable::new(
            run_stream(http, auth_failures, url, token, body, on_event, on_error),
            registration,
        );
        // An Err(Aborted) here is the caller's own cancellation; nothing
        // to report.
        tokio::spawn(task);

        StreamHandle::bound(abort_handle)
    }

    /// Send a chat message and wait for the complete answer.
    pub async fn send_blocking(&self, request: &ChatRequest) -> Result<ChatCompletionResult, Error> {
        if request.user.trim().is_empty() {
            return Err(Error::InvalidRequest("user must not be empty"));
        }
        if request.query.trim().is_empty() {
            return Err(Error::InvalidRequest("query must not be empty"));
        }

        let token = self
            .credentials
            .bearer_token()
            .ok_or(Error::Unauthenticated)?;
        let body = request_body(request, "blocking")?;

        let response = self
            .http
            .post(&self.chat_url(), &body, &auth_headers(&token, false))
            .await?;

        if response.status == 401 || response.status == 403 {
            self.auth_failures.on_auth_failure(&format!(
                "chat request rejected with status {}",
                response.status
            ));
            return Err(Error::AuthRejected {
                status: response.status,
            });
        }
        if !response.is_success() {
            return Err(status_error(response.status, response.text()));
        }

        response.json().map_err(Error::Json)
    }
}

/// Serialize the request with `response_mode` forced to `mode`,
/// regardless of anything the caller set.
fn request_body(request: &ChatRequest, mode: &str) -> Result<String, serde_json::Error> {
    let mut body = serde_json::to_value(request)?;
    body["response_mode"] = Value::String(mode.to_string());
    serde_json::to_string(&body)
}

fn auth_headers(token: &str, streaming: bool) -> Headers {
    let mut headers = Headers::new();
    headers.insert("Authorization".to_string(), format!("Bearer {token}"));
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    if streaming {
        headers.insert("Accept".to_string(), "text/event-stream".to_string());
    }
    headers
}

/// Build an [`Error::Status`] from a non-success response, parsing the
/// body as JSON best-effort.
fn status_error(status: u16, raw: String) -> Error {
    let parsed: ApiErrorBody = serde_json::from_str(&raw).unwrap_or_default();
    let message = match parsed.message {
        Some(message) => message,
        None => raw,
    };
    Error::Status {
        status,
        code: parsed.code,
        message,
    }
}

/// The asynchronous body of one streaming exchange: open the connection,
/// classify the status, then run the decode loop until end-of-stream.
async fn run_stream<F, E>(
    http: Arc<dyn HttpClient>,
    auth_failures: Arc<dyn AuthFailureHandler>,
    url: String,
    token: String,
    body: String,
    mut on_event: F,
    on_error: E,
) where
    F: FnMut(StreamEvent) + Send + 'static,
    E: FnOnce(Error) + Send + 'static,
{
    let mut on_error = Some(on_error);
    let mut fail = |err: Error| {
        if let Some(callback) = on_error.take() {
            callback(err);
        }
    };

    let mut stream = match http
        .post_stream(&url, &body, &auth_headers(&token, true))
        .await
    {
        Ok(stream) => stream,
        Err(HttpError::Status { status, .. }) if status == 401 || status == 403 => {
            debug!(status, "chat stream rejected, signaling re-auth");
            auth_failures
                .on_auth_failure(&format!("chat stream rejected with status {status}"));
            return;
        }
        Err(HttpError::Status { status, body }) => {
            fail(status_error(status, body));
            return;
        }
        Err(err) => {
            error!(%err, "failed to open chat stream");
            fail(Error::Http(err));
            return;
        }
    };

    let mut decoder = StreamDecoder::new();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                for event in decoder.feed(&bytes) {
                    on_event(event);
                }
            }
            Err(err) => {
                error!(%err, "chat stream read failed");
                fail(Error::Http(err));
                return;
            }
        }
    }

    if let Some(event) = decoder.finish() {
        on_event(event);
    }
    debug!("chat stream completed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{
        MockHttpClient, MockResponse, RecordingAuthHandler, StaticCredentials,
    };
    use crate::traits::Response;
    use bytes::Bytes;
    use std::time::Duration;
    use tokio::sync::mpsc;

    const BASE: &str = "http://test";
    const CHAT_URL: &str = "http://test/chat-messages";

    struct Fixture {
        client: ChatClient,
        http: MockHttpClient,
        auth: RecordingAuthHandler,
    }

    fn fixture_with_token(token: Option<&str>) -> Fixture {
        let http = MockHttpClient::new();
        let auth = RecordingAuthHandler::new();
        let credentials = match token {
            Some(token) => StaticCredentials::with_token(token),
            None => StaticCredentials::absent(),
        };
        let client = ChatClient::new(BASE, Arc::new(credentials), Arc::new(auth.clone()))
            .with_http_client(Arc::new(http.clone()));
        Fixture { client, http, auth }
    }

    /// Drive a stream to completion, collecting callback outcomes.
    async fn collect(
        client: &ChatClient,
        request: ChatRequest,
    ) -> (Vec<StreamEvent>, Vec<Error>, StreamHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();
        let handle = client.start_stream(
            request,
            move |event| {
                let _ = event_tx.send(Ok(event));
            },
            move |err| {
                let _ = tx.send(Err(err));
            },
        );
        let (events, errors) = drain(rx).await;
        (events, errors, handle)
    }

    async fn drain(
        mut rx: mpsc::UnboundedReceiver<Result<StreamEvent, Error>>,
    ) -> (Vec<StreamEvent>, Vec<Error>) {
        let mut events = Vec::new();
        let mut errors = Vec::new();
        loop {
            match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
                Ok(Some(Ok(event))) => events.push(event),
                Ok(Some(Err(err))) => errors.push(err),
                Ok(None) => break,
                Err(_) => panic!("stream did not complete within 5s"),
            }
        }
        (events, errors)
    }

    fn sse_body() -> Vec<Bytes> {
        vec![
            Bytes::from_static(
                b"data: {\"event\":\"message\",\"id\":\"m1\",\"answer\":\"Hel\"}\n\n",
            ),
            Bytes::from_static(
                b"data: {\"event\":\"message\",\"id\":\"m1\",\"answer\":\"lo\"}\n\nevent: ping\n\n",
            ),
            Bytes::from_static(b"data: {\"event\":\"message_end\",\"id\":\"m1\"}"),
        ]
    }

    #[tokio::test]
    async fn streams_events_in_order_and_flushes_tail() {
        let fx = fixture_with_token(Some("tok"));
        fx.http
            .set_response(CHAT_URL, MockResponse::Stream(sse_body()));

        let (events, errors, _) = collect(&fx.client, ChatRequest::new("hi", "u1")).await;

        assert!(errors.is_empty());
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], StreamEvent::AnswerDelta { text, .. } if text == "Hel"));
        assert!(matches!(&events[1], StreamEvent::AnswerDelta { text, .. } if text == "lo"));
        assert_eq!(events[2], StreamEvent::KeepAlive);
        // the unterminated trailing record is still delivered
        assert!(matches!(&events[3], StreamEvent::MessageEnded { id, .. } if id == "m1"));
        assert_eq!(fx.auth.call_count(), 0);
    }

    #[tokio::test]
    async fn forces_streaming_mode_and_bearer_header() {
        let fx = fixture_with_token(Some("secret-token"));
        fx.http
            .set_response(CHAT_URL, MockResponse::Stream(vec![]));

        let (_, errors, _) = collect(&fx.client, ChatRequest::new("hi", "u1")).await;
        assert!(errors.is_empty());

        let requests = fx.http.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].headers.get("Authorization").map(String::as_str),
            Some("Bearer secret-token")
        );
        let body: serde_json::Value =
            serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["response_mode"], "streaming");
        assert_eq!(body["query"], "hi");
        assert_eq!(body["user"], "u1");
    }

    #[tokio::test]
    async fn missing_credential_short_circuits() {
        let fx = fixture_with_token(None);

        let (events, errors, _) = collect(&fx.client, ChatRequest::new("hi", "u1")).await;

        assert!(events.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], Error::Unauthenticated));
        // no network call was made
        assert!(fx.http.requests().is_empty());
    }

    #[tokio::test]
    async fn empty_user_and_query_are_rejected_locally() {
        let fx = fixture_with_token(Some("tok"));

        let (_, errors, _) = collect(&fx.client, ChatRequest::new("hi", "  ")).await;
        assert!(matches!(errors[0], Error::InvalidRequest(_)));

        let (_, errors, _) = collect(&fx.client, ChatRequest::new("", "u1")).await;
        assert!(matches!(errors[0], Error::InvalidRequest(_)));

        assert!(fx.http.requests().is_empty());
    }

    #[tokio::test]
    async fn auth_rejection_goes_to_handler_not_on_error() {
        let fx = fixture_with_token(Some("stale"));
        fx.http.set_response(
            CHAT_URL,
            MockResponse::Error(HttpError::Status {
                status: 403,
                body: "{\"message\":\"forbidden\"}".to_string(),
            }),
        );

        let (events, errors, _) = collect(&fx.client, ChatRequest::new("hi", "u1")).await;

        assert!(events.is_empty());
        assert!(errors.is_empty());
        assert_eq!(fx.auth.call_count(), 1);
        assert!(fx.auth.reasons()[0].contains("403"));
    }

    #[tokio::test]
    async fn non_auth_status_parses_error_body() {
        let fx = fixture_with_token(Some("tok"));
        fx.http.set_response(
            CHAT_URL,
            MockResponse::Error(HttpError::Status {
                status: 400,
                body: "{\"code\":\"invalid_param\",\"message\":\"inputs is required\"}"
                    .to_string(),
            }),
        );

        let (_, errors, _) = collect(&fx.client, ChatRequest::new("hi", "u1")).await;

        assert_eq!(errors.len(), 1);
        match &errors[0] {
            Error::Status {
                status,
                code,
                message,
            } => {
                assert_eq!(*status, 400);
                assert_eq!(code.as_deref(), Some("invalid_param"));
                assert_eq!(message, "inputs is required");
            }
            other => panic!("expected Status error, got {:?}", other),
        }
        assert_eq!(fx.auth.call_count(), 0);
    }

    #[tokio::test]
    async fn unparseable_error_body_falls_back_to_raw_text() {
        let fx = fixture_with_token(Some("tok"));
        fx.http.set_response(
            CHAT_URL,
            MockResponse::Error(HttpError::Status {
                status: 502,
                body: "<html>bad gateway</html>".to_string(),
            }),
        );

        let (_, errors, _) = collect(&fx.client, ChatRequest::new("hi", "u1")).await;
        match &errors[0] {
            Error::Status { status, message, .. } => {
                assert_eq!(*status, 502);
                assert!(message.contains("bad gateway"));
            }
            other => panic!("expected Status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn mid_stream_read_error_is_surfaced() {
        let fx = fixture_with_token(Some("tok"));
        fx.http.set_response(
            CHAT_URL,
            MockResponse::StreamThenError(
                vec![Bytes::from_static(
                    b"data: {\"event\":\"message\",\"id\":\"m1\",\"answer\":\"a\"}\n\n",
                )],
                HttpError::Read("connection reset".to_string()),
            ),
        );

        let (events, errors, _) = collect(&fx.client, ChatRequest::new("hi", "u1")).await;

        assert_eq!(events.len(), 1);
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], Error::Http(HttpError::Read(_))));
    }

    #[tokio::test]
    async fn in_band_error_record_is_an_event_not_a_failure() {
        let fx = fixture_with_token(Some("tok"));
        fx.http.set_response(
            CHAT_URL,
            MockResponse::Stream(vec![Bytes::from_static(
                b"data: {\"event\":\"error\",\"status\":400,\"code\":\"moderation\",\"message\":\"flagged\"}\n\n",
            )]),
        );

        let (events, errors, _) = collect(&fx.client, ChatRequest::new("hi", "u1")).await;

        assert!(errors.is_empty());
        assert_eq!(events.len(), 1);
        assert!(
            matches!(&events[0], StreamEvent::StreamError { message, .. } if message == "flagged")
        );
    }

    #[tokio::test]
    async fn abort_before_first_chunk_emits_nothing() {
        let fx = fixture_with_token(Some("tok"));
        fx.http.set_response(CHAT_URL, MockResponse::Hang);

        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();
        let handle = fx.client.start_stream(
            ChatRequest::new("hi", "u1"),
            move |event| {
                let _ = event_tx.send(Ok(event));
            },
            move |err| {
                let _ = tx.send(Err(err));
            },
        );

        handle.abort();
        // idempotent
        handle.abort();

        let (events, errors) = drain(rx).await;
        assert!(events.is_empty());
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn send_blocking_happy_path() {
        let fx = fixture_with_token(Some("tok"));
        fx.http.set_response(
            CHAT_URL,
            MockResponse::Success(Response::new(
                200,
                Bytes::from_static(
                    br#"{"message_id":"m1","conversation_id":"c1","mode":"chat","answer":"Hello!","metadata":{"usage":{"total_tokens":9}},"created_at":1712000000}"#,
                ),
            )),
        );

        let result = fx
            .client
            .send_blocking(&ChatRequest::new("hi", "u1"))
            .await
            .unwrap();

        assert_eq!(result.answer, "Hello!");
        assert_eq!(result.usage().unwrap().total_tokens, Some(9));

        let body: serde_json::Value =
            serde_json::from_str(fx.http.requests()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["response_mode"], "blocking");
    }

    #[tokio::test]
    async fn send_blocking_auth_rejection_signals_handler() {
        let fx = fixture_with_token(Some("stale"));
        fx.http.set_response(
            CHAT_URL,
            MockResponse::Success(Response::new(401, Bytes::from_static(b"{}"))),
        );

        let err = fx
            .client
            .send_blocking(&ChatRequest::new("hi", "u1"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AuthRejected { status: 401 }));
        assert_eq!(fx.auth.call_count(), 1);
    }

    #[tokio::test]
    async fn send_blocking_maps_error_status() {
        let fx = fixture_with_token(Some("tok"));
        fx.http.set_response(
            CHAT_URL,
            MockResponse::Success(Response::new(
                429,
                Bytes::from_static(br#"{"code":"rate_limit","message":"slow down"}"#),
            )),
        );

        let err = fx
            .client
            .send_blocking(&ChatRequest::new("hi", "u1"))
            .await
            .unwrap_err();

        match err {
            Error::Status { status, code, .. } => {
                assert_eq!(status, 429);
                assert_eq!(code.as_deref(), Some("rate_limit"));
            }
            other => panic!("expected Status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_blocking_without_credential() {
        let fx = fixture_with_token(None);
        let err = fx
            .client
            .send_blocking(&ChatRequest::new("hi", "u1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));
        assert!(fx.http.requests().is_empty());
    }
}
