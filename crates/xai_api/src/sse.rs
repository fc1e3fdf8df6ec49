use serde_json::Value;

use crate::events::{StreamEvent, ToolCallDelta};

/// Line prefix marking an SSE data payload.
pub const DATA_PREFIX: &str = "data:";
/// Sentinel payload marking the authoritative end of a stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Incremental parser for SSE chat-completion streams.
///
/// `feed` may be called with chunks of arbitrary size and boundary; emitted
/// events depend only on the byte sequence, never on how it was chunked.
#[derive(Debug, Default)]
pub struct SseStreamParser {
    buffer: Vec<u8>,
}

impl SseStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete events.
    ///
    /// Only complete newline-terminated lines are processed; a trailing
    /// partial line is retained untouched for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        // Grow before the copy, with one spare byte for a terminator slot, so
        // a failed allocation can never leave the buffer partially written.
        self.buffer.reserve(bytes.len() + 1);
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line[..newline]);
            let line = line.trim_end_matches('\r');

            let Some(payload) = extract_data_payload(line) else {
                continue;
            };

            if payload == DONE_SENTINEL {
                // The sentinel is authoritative; stop scanning this call.
                events.push(StreamEvent::Done);
                break;
            }

            match serde_json::from_str::<Value>(payload) {
                Ok(chunk) => map_chunk(&chunk, &mut events),
                Err(_) => events.push(StreamEvent::DecodeError {
                    line: payload.to_string(),
                }),
            }
        }

        events
    }

    /// Parse a complete SSE payload string in one shot.
    pub fn parse_lines(input: &str) -> Vec<StreamEvent> {
        let mut parser = Self::default();
        parser.feed(input.as_bytes())
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();
    if payload.is_empty() {
        None
    } else {
        Some(payload)
    }
}

fn map_chunk(chunk: &Value, events: &mut Vec<StreamEvent>) {
    let Some(delta) = chunk
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("delta"))
    else {
        return;
    };

    if let Some(text) = delta.get("content").and_then(Value::as_str) {
        if !text.is_empty() {
            events.push(StreamEvent::TextDelta {
                text: text.to_owned(),
            });
        }
    }

    let Some(tool_calls) = delta.get("tool_calls").and_then(Value::as_array) else {
        return;
    };

    for (position, entry) in tool_calls.iter().enumerate() {
        let index = entry
            .get("index")
            .and_then(Value::as_u64)
            .map(|value| value as usize)
            .unwrap_or(position);
        let function = entry.get("function");

        events.push(StreamEvent::ToolCallDelta(ToolCallDelta {
            index,
            id: non_empty_string(entry.get("id")),
            name: non_empty_string(function.and_then(|function| function.get("name"))),
            arguments: function
                .and_then(|function| function.get("arguments"))
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
        }));
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}
