//! Wire payload deserialization structs.
//!
//! Internal structs mirroring the JSON shape of each `data:` record.
//! Workflow and node events nest their detail under a `data` object next
//! to `workflow_run_id`; the envelope fields are flattened at the root of
//! every record.

use serde::Deserialize;
use serde_json::Value;

use super::events::{EventMeta, NodeStatus, OwnerRole, WorkflowStatus};
use crate::models::{RetrieverResource, Usage};

/// Minimal probe to read the `event` discriminator before a typed parse.
#[derive(Debug, Deserialize)]
pub(crate) struct EventProbe {
    pub event: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerPayload {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub answer: String,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FilePayload {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub file_type: String,
    pub belongs_to: OwnerRole,
    #[serde(default)]
    pub url: String,
    #[serde(flatten)]
    pub meta: EventMeta,
}

/// `message_end` nests usage/citations under `metadata` on current
/// backends; older ones put them at the top level. Both are accepted,
/// `metadata` wins.
#[derive(Debug, Deserialize)]
pub(crate) struct MessageEndPayload {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub metadata: Option<MessageEndMetadata>,
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub retriever_resources: Option<Vec<RetrieverResource>>,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MessageEndMetadata {
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub retriever_resources: Option<Vec<RetrieverResource>>,
}

impl MessageEndPayload {
    pub(crate) fn into_parts(self) -> (String, Option<Usage>, Vec<RetrieverResource>, EventMeta) {
        let metadata = self.metadata.unwrap_or_default();
        let usage = metadata.usage.or(self.usage);
        let sources = metadata
            .retriever_resources
            .or(self.retriever_resources)
            .unwrap_or_default();
        (self.id, usage, sources, self.meta)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AudioPayload {
    #[serde(default)]
    pub audio: String,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReplacePayload {
    #[serde(default)]
    pub answer: String,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkflowStartedPayload {
    pub workflow_run_id: String,
    pub data: WorkflowStartedData,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkflowStartedData {
    #[serde(default)]
    pub sequence_number: u64,
    #[serde(default)]
    pub inputs: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeStartedPayload {
    pub workflow_run_id: String,
    pub data: NodeStartedData,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeStartedData {
    pub node_id: String,
    #[serde(default)]
    pub node_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub predecessor_node_id: Option<String>,
    #[serde(default)]
    pub inputs: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeFinishedPayload {
    pub workflow_run_id: String,
    pub data: NodeFinishedData,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeFinishedData {
    pub node_id: String,
    #[serde(default)]
    pub index: u32,
    pub status: NodeStatus,
    #[serde(default)]
    pub outputs: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub elapsed_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkflowFinishedPayload {
    pub workflow_run_id: String,
    pub data: WorkflowFinishedData,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkflowFinishedData {
    pub status: WorkflowStatus,
    #[serde(default)]
    pub outputs: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub total_steps: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(flatten)]
    pub meta: EventMeta,
}
