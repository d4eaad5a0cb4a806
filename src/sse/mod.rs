//! Streaming wire protocol decode.
//!
//! The chat endpoint streams its response as blank-line-separated records,
//! each either `data: <json>` (typed by the JSON's `event` field) or a
//! bare `event: <name>` line.
//!
//! # Module structure
//! - `events` - Typed event definitions ([`StreamEvent`], [`EventMeta`])
//! - `payloads` - Internal payload deserialization structs
//! - `parser` - Single-record parsing ([`parse_record`], [`RecordError`])
//! - `decoder` - Incremental chunk decoding ([`StreamDecoder`])

mod decoder;
mod events;
mod parser;
mod payloads;

pub use decoder::{DecodeDiagnostic, StreamDecoder};
pub use events::{
    decode_audio, EventMeta, NodeStatus, OwnerRole, StreamEvent, WorkflowStatus,
};
pub use parser::{parse_record, RecordError};
