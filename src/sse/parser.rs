//! Record parsing logic.
//!
//! A *record* is one blank-line-delimited unit of the streaming wire
//! protocol, either `data: <json>` (the JSON carries an `event` field
//! naming its type) or a bare `event: <name>` line. [`parse_record`] maps
//! one complete record to its typed [`StreamEvent`], or classifies why it
//! could not.

use thiserror::Error;

use super::events::StreamEvent;
use super::payloads::{
    AnswerPayload, AudioPayload, ErrorPayload, EventProbe, FilePayload, MessageEndPayload,
    NodeFinishedPayload, NodeStartedPayload, ReplacePayload, WorkflowFinishedPayload,
    WorkflowStartedPayload,
};

const DATA_PREFIX: &str = "data:";
const EVENT_PREFIX: &str = "event:";
const KEEP_ALIVE: &str = "ping";

/// Why a record did not produce an event.
///
/// None of these abort the stream: the decoder logs them (and reports
/// them to the diagnostics hook, if installed) and moves on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    /// The `data:` payload was not valid JSON, or had no `event` field.
    #[error("invalid JSON in data record: {0}")]
    InvalidJson(String),

    /// The payload parsed as JSON but not as its event's expected shape.
    #[error("malformed '{event}' payload: {message}")]
    BadPayload { event: String, message: String },

    /// An event name this client does not know (forward compatibility).
    #[error("unknown event name: {0}")]
    UnknownEvent(String),
}

/// Parse one complete record into a typed event.
///
/// Returns `Ok(None)` for records that are valid but carry nothing for
/// the application: blank records and unrecognized prefixes.
pub fn parse_record(record: &str) -> Result<Option<StreamEvent>, RecordError> {
    let record = record.trim();
    if record.is_empty() {
        return Ok(None);
    }

    if let Some(data) = record.strip_prefix(DATA_PREFIX) {
        return parse_data_record(data.trim()).map(Some);
    }

    if let Some(name) = record.strip_prefix(EVENT_PREFIX) {
        let name = name.trim();
        if name == KEEP_ALIVE {
            return Ok(Some(StreamEvent::KeepAlive));
        }
        return Err(RecordError::UnknownEvent(name.to_string()));
    }

    // Comments and any other prefix carry nothing for us.
    Ok(None)
}

/// Parse the JSON payload of a `data:` record, dispatching on its `event`
/// field.
fn parse_data_record(data: &str) -> Result<StreamEvent, RecordError> {
    let probe: EventProbe =
        serde_json::from_str(data).map_err(|err| RecordError::InvalidJson(err.to_string()))?;

    let typed = |err: serde_json::Error| RecordError::BadPayload {
        event: probe.event.clone(),
        message: err.to_string(),
    };

    match probe.event.as_str() {
        "message" => {
            let p: AnswerPayload = serde_json::from_str(data).map_err(typed)?;
            Ok(StreamEvent::AnswerDelta {
                id: p.id,
                text: p.answer,
                meta: p.meta,
            })
        }
        "message_file" => {
            let p: FilePayload = serde_json::from_str(data).map_err(typed)?;
            Ok(StreamEvent::FileAttached {
                id: p.id,
                file_type: p.file_type,
                belongs_to: p.belongs_to,
                url: p.url,
                meta: p.meta,
            })
        }
        "message_end" => {
            let p: MessageEndPayload = serde_json::from_str(data).map_err(typed)?;
            let (id, usage, cited_sources, meta) = p.into_parts();
            Ok(StreamEvent::MessageEnded {
                id,
                usage,
                cited_sources,
                meta,
            })
        }
        "tts_message" => {
            let p: AudioPayload = serde_json::from_str(data).map_err(typed)?;
            Ok(StreamEvent::AudioChunk {
                audio: p.audio,
                meta: p.meta,
            })
        }
        "tts_message_end" => {
            let p: AudioPayload = serde_json::from_str(data).map_err(typed)?;
            Ok(StreamEvent::AudioEnded { meta: p.meta })
        }
        "message_replace" => {
            let p: ReplacePayload = serde_json::from_str(data).map_err(typed)?;
            Ok(StreamEvent::AnswerReplace {
                text: p.answer,
                meta: p.meta,
            })
        }
        "workflow_started" => {
            let p: WorkflowStartedPayload = serde_json::from_str(data).map_err(typed)?;
            Ok(StreamEvent::WorkflowStarted {
                workflow_run_id: p.workflow_run_id,
                sequence_number: p.data.sequence_number,
                inputs: p.data.inputs,
                meta: p.meta,
            })
        }
        "node_started" => {
            let p: NodeStartedPayload = serde_json::from_str(data).map_err(typed)?;
            Ok(StreamEvent::NodeStarted {
                workflow_run_id: p.workflow_run_id,
                node_id: p.data.node_id,
                node_type: p.data.node_type,
                title: p.data.title,
                index: p.data.index,
                predecessor_node_id: p.data.predecessor_node_id,
                inputs: p.data.inputs,
                meta: p.meta,
            })
        }
        "node_finished" => {
            let p: NodeFinishedPayload = serde_json::from_str(data).map_err(typed)?;
            Ok(StreamEvent::NodeFinished {
                workflow_run_id: p.workflow_run_id,
                node_id: p.data.node_id,
                index: p.data.index,
                status: p.data.status,
                outputs: p.data.outputs,
                error: p.data.error,
                elapsed_time: p.data.elapsed_time,
                meta: p.meta,
            })
        }
        "workflow_finished" => {
            let p: WorkflowFinishedPayload = serde_json::from_str(data).map_err(typed)?;
            Ok(StreamEvent::WorkflowFinished {
                workflow_run_id: p.workflow_run_id,
                status: p.data.status,
                outputs: p.data.outputs,
                error: p.data.error,
                total_steps: p.data.total_steps,
                meta: p.meta,
            })
        }
        "error" => {
            let p: ErrorPayload = serde_json::from_str(data).map_err(typed)?;
            Ok(StreamEvent::StreamError {
                status: p.status,
                code: p.code,
                message: p.message,
                meta: p.meta,
            })
        }
        // Some backends send the keep-alive as a data record too.
        "ping" => Ok(StreamEvent::KeepAlive),
        other => Err(RecordError::UnknownEvent(other.to_string())),
    }
}
