//! Incremental decoder for the chat endpoint's server-sent-event body.
//!
//! Bytes are pushed as they arrive from the transport; complete frames are
//! pulled out one at a time with [`SseDecoder::next_item`]. A frame is the text
//! between two `"\n\n"` delimiters. Only `data:` frames carry a payload, and a
//! payload is either the `[DONE]` sentinel or a JSON [`StreamEvent`].

use log::debug;
use serde::Deserialize;

const FRAME_DELIMITER: &str = "\n\n";
const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Records the agent service emits on its stream. Any other `type` fails to
/// deserialize and the frame is skipped.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// One fragment of assistant text.
    Token { content: String },
    /// A complete intermediate message (tool calls, tool results).
    Message {
        #[serde(default)]
        content: serde_json::Value,
    },
    Error {
        #[serde(default)]
        content: serde_json::Value,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SseItem {
    Event(StreamEvent),
    Done,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
    /// Tail of a UTF-8 sequence cut by a chunk boundary.
    pending: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw body bytes to the text buffer.
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        let mut bytes = std::mem::take(&mut self.pending);
        let mut consumed = 0;

        loop {
            match std::str::from_utf8(&bytes[consumed..]) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    consumed = bytes.len();
                    break;
                }
                Err(e) => {
                    let valid_end = consumed + e.valid_up_to();
                    if let Ok(valid) = std::str::from_utf8(&bytes[consumed..valid_end]) {
                        self.buffer.push_str(valid);
                    }
                    match e.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            consumed = valid_end + len;
                        }
                        None => {
                            consumed = valid_end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = bytes.split_off(consumed);
    }

    /// Pops the next significant frame from the buffer. Frames that are not
    /// `data:` frames, or whose payload does not parse, are dropped here.
    /// Returns `None` once no complete frame remains.
    pub fn next_item(&mut self) -> Option<SseItem> {
        while let Some(boundary) = self.buffer.find(FRAME_DELIMITER) {
            let frame: String = self.buffer.drain(..boundary + FRAME_DELIMITER.len()).collect();
            if let Some(item) = parse_frame(&frame[..boundary]) {
                return Some(item);
            }
        }
        None
    }

    /// Text still waiting for a delimiter.
    pub fn remainder(&self) -> &str {
        &self.buffer
    }
}

fn parse_frame(frame: &str) -> Option<SseItem> {
    let data = frame.trim().strip_prefix(DATA_PREFIX)?.trim();
    if data == DONE_SENTINEL {
        return Some(SseItem::Done);
    }
    match serde_json::from_str::<StreamEvent>(data) {
        Ok(event) => Some(SseItem::Event(event)),
        Err(e) => {
            debug!("Skipping undecodable stream frame ({}): {}", e, data);
            None
        }
    }
}
