//! Request and response types for the chat API.
//!
//! Mirrors the backend's JSON contract: the `/chat-messages` request body,
//! the blocking-mode completion response, and the usage/citation records
//! shared with the streaming `message_end` event.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A chat message request.
///
/// `response_mode` is deliberately absent: the client forces `"streaming"`
/// or `"blocking"` depending on the call path, regardless of caller intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's question or input text
    pub query: String,
    /// App-defined variable values
    #[serde(default)]
    pub inputs: Map<String, Value>,
    /// Opaque end-user identifier
    pub user: String,
    /// Conversation to continue; omit to start a new one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Files referenced by this message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<RequestFile>>,
    /// Let the backend auto-title a new conversation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_generate_name: Option<bool>,
}

impl ChatRequest {
    /// Create a request that starts a new conversation.
    pub fn new(query: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            inputs: Map::new(),
            user: user.into(),
            conversation_id: None,
            files: None,
            auto_generate_name: None,
        }
    }

    /// Create a request that continues an existing conversation.
    pub fn in_conversation(
        query: impl Into<String>,
        user: impl Into<String>,
        conversation_id: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: Some(conversation_id.into()),
            ..Self::new(query, user)
        }
    }

    /// Attach files to the request.
    pub fn with_files(mut self, files: Vec<RequestFile>) -> Self {
        self.files = Some(files);
        self
    }

    /// Set an app-defined input variable.
    pub fn with_input(mut self, key: impl Into<String>, value: Value) -> Self {
        self.inputs.insert(key.into(), value);
        self
    }
}

/// File category accepted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Document,
    Image,
    Audio,
    Video,
    Custom,
}

/// How a request file reaches the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMethod {
    /// The backend fetches the file from `url`
    RemoteUrl,
    /// The file was uploaded beforehand; referenced by `upload_file_id`
    LocalFile,
}

/// A file reference in a chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFile {
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub transfer_method: TransferMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_file_id: Option<String>,
}

impl RequestFile {
    /// A file the backend should fetch from a URL.
    pub fn remote(kind: FileKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            transfer_method: TransferMethod::RemoteUrl,
            url: Some(url.into()),
            upload_file_id: None,
        }
    }

    /// A previously-uploaded file referenced by its upload ID.
    pub fn uploaded(kind: FileKind, upload_file_id: impl Into<String>) -> Self {
        Self {
            kind,
            transfer_method: TransferMethod::LocalFile,
            url: None,
            upload_file_id: Some(upload_file_id.into()),
        }
    }
}

/// Token usage reported with a completed assistant turn.
///
/// Every field is optional; backends differ in how much accounting they
/// attach.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
    #[serde(default)]
    pub total_price: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub latency: Option<f64>,
}

/// A retrieval citation attached to a completed assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrieverResource {
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub dataset_name: Option<String>,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub document_name: Option<String>,
    #[serde(default)]
    pub segment_id: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    /// The cited passage text
    #[serde(default)]
    pub content: String,
}

/// Usage and citations as nested by current backends under `metadata`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompletionMetadata {
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub retriever_resources: Option<Vec<RetrieverResource>>,
}

/// Blocking-mode chat completion response.
///
/// Usage and citations arrive nested under `metadata` on current backends,
/// or at the top level on older ones; [`ChatCompletionResult::usage`] and
/// [`ChatCompletionResult::cited_sources`] resolve both layouts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatCompletionResult {
    pub message_id: String,
    pub conversation_id: String,
    #[serde(default)]
    pub mode: String,
    pub answer: String,
    #[serde(default)]
    pub metadata: Option<CompletionMetadata>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    retriever_resources: Option<Vec<RetrieverResource>>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl ChatCompletionResult {
    /// Token usage for this turn, wherever the backend put it.
    pub fn usage(&self) -> Option<&Usage> {
        self.metadata
            .as_ref()
            .and_then(|m| m.usage.as_ref())
            .or(self.usage.as_ref())
    }

    /// Retrieval citations for this turn, wherever the backend put them.
    pub fn cited_sources(&self) -> &[RetrieverResource] {
        self.metadata
            .as_ref()
            .and_then(|m| m.retriever_resources.as_deref())
            .or(self.retriever_resources.as_deref())
            .unwrap_or_default()
    }
}

/// Best-effort parse target for non-success HTTP response bodies.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
