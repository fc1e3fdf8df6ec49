use xai_api::{ChatMessage, Role};

/// Messages kept at the tail when the history is truncated; two full
/// user/assistant exchanges.
pub const DEFAULT_RETAIN_RECENT: usize = 4;
/// Approximate byte budget before the history is truncated.
pub const DEFAULT_BYTE_THRESHOLD: usize = 60 * 1024;

/// Ordered, size-bounded conversation transcript.
///
/// The entry at index 0 is always the system instruction and is never
/// evicted. `byte_count` is a cheap approximation (role plus content plus
/// serialized tool calls), not the true request payload size.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
    byte_count: usize,
    retain_recent: usize,
}

impl ConversationHistory {
    pub fn new(system_instruction: impl Into<String>) -> Self {
        let mut history = Self {
            messages: Vec::new(),
            byte_count: 0,
            retain_recent: DEFAULT_RETAIN_RECENT,
        };
        history.push(ChatMessage::system(system_instruction));
        history
    }

    pub fn with_retain_recent(mut self, retain_recent: usize) -> Self {
        self.retain_recent = retain_recent;
        self
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.byte_count += approximate_len(&message);
        self.messages.push(message);
    }

    pub fn byte_count(&self) -> usize {
        self.byte_count
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Ordered read-only view for request serialization.
    pub fn build_request_messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Drop the most recent entry, undoing an in-flight turn after a
    /// transport failure.
    pub fn pop(&mut self) -> Option<ChatMessage> {
        let message = self.messages.pop()?;
        // Popping the system entry would break the index-0 invariant.
        if message.role == Role::System && self.messages.is_empty() {
            self.messages.push(message);
            return None;
        }
        self.byte_count = self.byte_count.saturating_sub(approximate_len(&message));
        Some(message)
    }

    /// Evict old entries when the approximate size exceeds `threshold`.
    ///
    /// Retains the system entry plus the most recent `retain_recent`
    /// messages. The count is recomputed from scratch over the survivors;
    /// incremental decrements would drift against the approximation.
    pub fn truncate_if_over(&mut self, threshold: usize) {
        if self.byte_count <= threshold {
            return;
        }

        let evictable = self.messages.len().saturating_sub(1);
        if evictable <= self.retain_recent {
            return;
        }

        let cutoff = self.messages.len() - self.retain_recent;
        self.messages.drain(1..cutoff);
        self.byte_count = self.messages.iter().map(approximate_len).sum();
    }
}

fn approximate_len(message: &ChatMessage) -> usize {
    let content_len = message.content.as_deref().map_or(0, str::len);
    let tool_calls_len = message
        .tool_calls
        .as_ref()
        .and_then(|calls| serde_json::to_string(calls).ok())
        .map_or(0, |json| json.len());

    message.role.as_str().len() + content_len + tool_calls_len
}
