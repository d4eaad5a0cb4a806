//! chatwire - streaming client for a hosted conversational-AI chat API
//!
//! The interesting part lives in [`sse`]: an incremental decoder that
//! turns a chunked, SSE-style response body into typed [`StreamEvent`]s,
//! tolerant of records and multi-byte characters split across chunk
//! boundaries. [`api::ChatClient`] wires that decoder to a cancellable
//! authenticated POST.
//!
//! ```ignore
//! use std::sync::Arc;
//! use chatwire::{api::ChatClient, models::ChatRequest, sse::StreamEvent};
//!
//! let client = ChatClient::new("https://api.example.com/v1", credentials, reauth);
//! let handle = client.start_stream(
//!     ChatRequest::new("What's the weather?", "user-1"),
//!     |event| {
//!         if let StreamEvent::AnswerDelta { text, .. } = event {
//!             print!("{text}");
//!         }
//!     },
//!     |err| eprintln!("stream failed: {err}"),
//! );
//! // ... handle.abort() to cancel
//! ```

pub mod adapters;
pub mod api;
pub mod error;
pub mod models;
pub mod sse;
pub mod traits;

pub use api::{ChatClient, StreamHandle};
pub use error::Error;
pub use sse::{StreamDecoder, StreamEvent};
