//! Typed stream events.
//!
//! Contains the [`StreamEvent`] enum with all event variants the backend
//! emits on the streaming chat endpoint, plus the shared [`EventMeta`]
//! envelope carried by every variant except [`StreamEvent::KeepAlive`].

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use serde_json::Value;

use crate::models::{RetrieverResource, Usage};

/// Envelope fields the backend flattens into every event record.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct EventMeta {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Unix timestamp (seconds)
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Who a streamed file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerRole {
    User,
    Assistant,
}

/// Execution state reported for a single workflow node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Running,
    Succeeded,
    Failed,
    Stopped,
}

/// Terminal state of a whole workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Succeeded,
    Failed,
    Stopped,
}

/// One decoded record from the streaming chat response.
///
/// Events arrive in wire order; the decoder never reorders or batches
/// them. Unknown record types are dropped by the decoder and never
/// surface here.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// One incremental slice of assistant answer text
    AnswerDelta {
        id: String,
        text: String,
        meta: EventMeta,
    },
    /// A file produced by or attached to the current turn
    FileAttached {
        id: String,
        file_type: String,
        belongs_to: OwnerRole,
        url: String,
        meta: EventMeta,
    },
    /// Terminal marker for one assistant turn
    MessageEnded {
        id: String,
        usage: Option<Usage>,
        cited_sources: Vec<RetrieverResource>,
        meta: EventMeta,
    },
    /// A base64-encoded audio chunk of the spoken answer
    AudioChunk { audio: String, meta: EventMeta },
    /// End of the audio stream
    AudioEnded { meta: EventMeta },
    /// Discard accumulated answer text and replace it wholesale
    /// (moderation/redaction rewrites)
    AnswerReplace { text: String, meta: EventMeta },
    /// A workflow run began
    WorkflowStarted {
        workflow_run_id: String,
        sequence_number: u64,
        inputs: Option<Value>,
        meta: EventMeta,
    },
    /// A workflow node began executing
    NodeStarted {
        workflow_run_id: String,
        node_id: String,
        node_type: String,
        title: String,
        index: u32,
        predecessor_node_id: Option<String>,
        inputs: Option<Value>,
        meta: EventMeta,
    },
    /// A workflow node finished (in any state)
    NodeFinished {
        workflow_run_id: String,
        node_id: String,
        index: u32,
        status: NodeStatus,
        outputs: Option<Value>,
        error: Option<String>,
        elapsed_time: Option<f64>,
        meta: EventMeta,
    },
    /// The workflow run reached a terminal state
    WorkflowFinished {
        workflow_run_id: String,
        status: WorkflowStatus,
        outputs: Option<Value>,
        error: Option<String>,
        total_steps: Option<u32>,
        meta: EventMeta,
    },
    /// In-band error signaled by the server without closing the transport
    StreamError {
        status: Option<u16>,
        code: Option<String>,
        message: String,
        meta: EventMeta,
    },
    /// Liveness signal; carries nothing and must not reset any state
    KeepAlive,
}

impl StreamEvent {
    /// The wire event name this variant decodes from.
    pub fn event_name(&self) -> &'static str {
        match self {
            StreamEvent::AnswerDelta { .. } => "message",
            StreamEvent::FileAttached { .. } => "message_file",
            StreamEvent::MessageEnded { .. } => "message_end",
            StreamEvent::AudioChunk { .. } => "tts_message",
            StreamEvent::AudioEnded { .. } => "tts_message_end",
            StreamEvent::AnswerReplace { .. } => "message_replace",
            StreamEvent::WorkflowStarted { .. } => "workflow_started",
            StreamEvent::NodeStarted { .. } => "node_started",
            StreamEvent::NodeFinished { .. } => "node_finished",
            StreamEvent::WorkflowFinished { .. } => "workflow_finished",
            StreamEvent::StreamError { .. } => "error",
            StreamEvent::KeepAlive => "ping",
        }
    }

    /// The shared envelope, for every variant that carries one.
    pub fn meta(&self) -> Option<&EventMeta> {
        match self {
            StreamEvent::AnswerDelta { meta, .. }
            | StreamEvent::FileAttached { meta, .. }
            | StreamEvent::MessageEnded { meta, .. }
            | StreamEvent::AudioChunk { meta, .. }
            | StreamEvent::AudioEnded { meta }
            | StreamEvent::AnswerReplace { meta, .. }
            | StreamEvent::WorkflowStarted { meta, .. }
            | StreamEvent::NodeStarted { meta, .. }
            | StreamEvent::NodeFinished { meta, .. }
            | StreamEvent::WorkflowFinished { meta, .. }
            | StreamEvent::StreamError { meta, .. } => Some(meta),
            StreamEvent::KeepAlive => None,
        }
    }
}

/// Decode the base64 payload of an [`StreamEvent::AudioChunk`].
pub fn decode_audio(audio: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64.decode(audio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_name_round_trip() {
        let event = StreamEvent::AnswerDelta {
            id: "m1".to_string(),
            text: "Hi".to_string(),
            meta: EventMeta::default(),
        };
        assert_eq!(event.event_name(), "message");
        assert_eq!(StreamEvent::KeepAlive.event_name(), "ping");
        assert_eq!(
            StreamEvent::AudioEnded {
                meta: EventMeta::default()
            }
            .event_name(),
            "tts_message_end"
        );
    }

    #[test]
    fn meta_absent_only_for_keep_alive() {
        assert!(StreamEvent::KeepAlive.meta().is_none());

        let event = StreamEvent::AnswerReplace {
            text: "[redacted]".to_string(),
            meta: EventMeta {
                task_id: Some("t1".to_string()),
                ..Default::default()
            },
        };
        assert_eq!(event.meta().unwrap().task_id.as_deref(), Some("t1"));
    }

    #[test]
    fn audio_decodes_from_base64() {
        let decoded = decode_audio("aGVsbG8=").unwrap();
        assert_eq!(decoded, b"hello");
        assert!(decode_audio("not//valid!!").is_err());
    }

    #[test]
    fn status_discriminants_deserialize_snake_case() {
        let status: NodeStatus = serde_json::from_str("\"succeeded\"").unwrap();
        assert_eq!(status, NodeStatus::Succeeded);
        let status: WorkflowStatus = serde_json::from_str("\"stopped\"").unwrap();
        assert_eq!(status, WorkflowStatus::Stopped);
        let role: OwnerRole = serde_json::from_str("\"assistant\"").unwrap();
        assert_eq!(role, OwnerRole::Assistant);
    }
}
