//! Incremental stream decoding.
//!
//! [`StreamDecoder`] turns the raw chunked response body into typed
//! [`StreamEvent`]s. It owns the per-stream decode buffer and handles the
//! two boundary hazards of chunked delivery:
//!
//! - a multi-byte UTF-8 character split across two chunks decodes to the
//!   correct character once the remainder arrives, never to a replacement
//!   character;
//! - a record split across chunks is held until its blank-line terminator
//!   shows up, and an unterminated trailing record is still emitted when
//!   the stream ends.
//!
//! Malformed records and unknown event names are dropped without
//! disturbing the rest of the stream; install a diagnostics hook with
//! [`StreamDecoder::with_diagnostics`] to observe the drops.

use tracing::{debug, warn};

use super::events::StreamEvent;
use super::parser::{parse_record, RecordError};

/// Record separator: a blank line.
const RECORD_SEPARATOR: &str = "\n\n";

/// A dropped input the decoder chose to tolerate.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeDiagnostic {
    /// A record whose payload could not be parsed
    MalformedRecord { record: String, reason: String },
    /// A record with an event name this client does not know
    UnknownEvent { name: String },
    /// Bytes that were not valid UTF-8 (replaced in the output)
    InvalidUtf8 { len: usize },
}

type DiagnosticHook = Box<dyn FnMut(DecodeDiagnostic) + Send>;

/// Stateful decoder for one streaming response body.
///
/// Create one per stream, call [`feed`](Self::feed) for every chunk in
/// arrival order, then [`finish`](Self::finish) exactly once at
/// end-of-stream. Never share a decoder across streams.
pub struct StreamDecoder {
    /// Decoded text not yet framed into records
    text: String,
    /// Trailing bytes of an incomplete UTF-8 sequence
    partial: Vec<u8>,
    diagnostics: Option<DiagnosticHook>,
}

impl StreamDecoder {
    /// Create a decoder with the default drop behavior (log and move on).
    pub fn new() -> Self {
        Self {
            text: String::new(),
            partial: Vec::new(),
            diagnostics: None,
        }
    }

    /// Create a decoder that reports every dropped input to `hook`.
    ///
    /// The hook observes drops; it cannot veto them. Emitted events are
    /// unaffected by its presence.
    pub fn with_diagnostics(hook: impl FnMut(DecodeDiagnostic) + Send + 'static) -> Self {
        Self {
            diagnostics: Some(Box::new(hook)),
            ..Self::new()
        }
    }

    /// Decode one chunk of the response body.
    ///
    /// Returns every event completed by this chunk, in wire order. An
    /// empty return just means no record terminator arrived yet.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.decode_utf8(chunk);

        let mut events = Vec::new();
        while let Some(idx) = self.text.find(RECORD_SEPARATOR) {
            let record: String = self.text.drain(..idx + RECORD_SEPARATOR.len()).collect();
            if let Some(event) = self.handle_record(record.trim()) {
                events.push(event);
            }
        }
        events
    }

    /// Flush the decoder at end-of-stream.
    ///
    /// The server may close the stream without a final blank line; a
    /// non-blank trailing record is parsed and emitted here.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        if !self.partial.is_empty() {
            let len = self.partial.len();
            debug!(len, "stream ended inside a UTF-8 sequence; dropping tail bytes");
            self.partial.clear();
            self.note(DecodeDiagnostic::InvalidUtf8 { len });
        }

        let rest = std::mem::take(&mut self.text);
        self.handle_record(rest.trim())
    }

    /// Append a chunk to the text buffer, carrying incomplete UTF-8
    /// sequences across chunk boundaries.
    fn decode_utf8(&mut self, chunk: &[u8]) {
        let bytes: Vec<u8>;
        let mut input: &[u8] = if self.partial.is_empty() {
            chunk
        } else {
            let mut carried = std::mem::take(&mut self.partial);
            carried.extend_from_slice(chunk);
            bytes = carried;
            &bytes
        };

        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    self.push_text(text);
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&input[..valid]) {
                        self.push_text(text);
                    }
                    match err.error_len() {
                        // Incomplete trailing sequence: wait for the rest.
                        None => {
                            self.partial = input[valid..].to_vec();
                            break;
                        }
                        // Genuinely invalid bytes: replace and continue.
                        Some(len) => {
                            warn!(offset = valid, len, "invalid UTF-8 in stream body");
                            self.note(DecodeDiagnostic::InvalidUtf8 { len });
                            self.push_text("\u{FFFD}");
                            input = &input[valid + len..];
                        }
                    }
                }
            }
        }
    }

    /// Append decoded text, normalizing `\r\n` to `\n` so CRLF-framed
    /// bodies still split on the blank-line separator. A `\r`/`\n` pair
    /// split across chunks is handled by the buffer-tail check.
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.text.ends_with('\r') && text.starts_with('\n') {
            self.text.pop();
        }
        if text.contains('\r') {
            self.text.push_str(&text.replace("\r\n", "\n"));
        } else {
            self.text.push_str(text);
        }
    }

    /// Parse one complete record, swallowing anything unusable.
    fn handle_record(&mut self, record: &str) -> Option<StreamEvent> {
        if record.is_empty() {
            return None;
        }
        match parse_record(record) {
            Ok(event) => event,
            Err(RecordError::UnknownEvent(name)) => {
                debug!(event = %name, "dropping record with unknown event name");
                self.note(DecodeDiagnostic::UnknownEvent { name });
                None
            }
            Err(err) => {
                warn!(%err, "dropping malformed stream record");
                self.note(DecodeDiagnostic::MalformedRecord {
                    record: record.to_string(),
                    reason: err.to_string(),
                });
                None
            }
        }
    }

    fn note(&mut self, diagnostic: DecodeDiagnostic) {
        if let Some(hook) = self.diagnostics.as_mut() {
            hook(diagnostic);
        }
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StreamDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDecoder")
            .field("buffered_text", &self.text.len())
            .field("partial_utf8", &self.partial.len())
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}
