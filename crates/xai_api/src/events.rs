/// Fragment of a tool call delivered by one streamed delta.
///
/// Continuation chunks routinely omit `id` and `name`; only `index` is
/// guaranteed on every delta for the same call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolCallDelta {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// Stream event emitted by the parser after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Assistant text fragment from `choices[0].delta.content`.
    TextDelta { text: String },
    /// Tool-call fragment from one `choices[0].delta.tool_calls` entry.
    ToolCallDelta(ToolCallDelta),
    /// The `[DONE]` sentinel; authoritative end of the stream.
    Done,
    /// A `data:` line whose payload failed to decode. The stream continues.
    DecodeError { line: String },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}
