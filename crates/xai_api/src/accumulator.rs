use std::collections::BTreeMap;

use crate::error::XaiApiError;
use crate::events::ToolCallDelta;
use crate::payload::ToolCallDescriptor;

/// Partially assembled tool call, scoped to one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallFragment {
    pub id: Option<String>,
    pub name: Option<String>,
    /// Concatenated argument fragments; well-formed JSON only once the turn
    /// has delivered every delta for this call.
    pub arguments: String,
}

impl ToolCallFragment {
    fn merge(&mut self, delta: &ToolCallDelta) {
        // id and name are set-once: continuation chunks omit them, and a
        // repeated value must never clobber what the first chunk carried.
        if self.id.is_none() {
            self.id.clone_from(&delta.id);
        }
        if self.name.is_none() {
            self.name.clone_from(&delta.name);
        }
        if let Some(arguments) = &delta.arguments {
            self.arguments.reserve(arguments.len());
            self.arguments.push_str(arguments);
        }
    }
}

/// Assembles complete tool calls from fragmented stream deltas.
///
/// The accumulator never decides completion on its own; the caller drains it
/// with [`ToolCallAccumulator::finish`] once the stream has reached its
/// terminal sentinel.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    fragments: BTreeMap<usize, ToolCallFragment>,
}

impl ToolCallAccumulator {
    /// Fold one delta into the fragment at its call index.
    pub fn apply(&mut self, delta: &ToolCallDelta) -> &ToolCallFragment {
        let fragment = self.fragments.entry(delta.index).or_default();
        fragment.merge(delta);
        fragment
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Drain accumulated fragments into completed descriptors, index order.
    ///
    /// A fragment that never received an id or a function name is a protocol
    /// violation; the whole batch is rejected and nothing may be dispatched.
    pub fn finish(self) -> Result<Vec<ToolCallDescriptor>, XaiApiError> {
        let mut calls = Vec::with_capacity(self.fragments.len());

        for (index, fragment) in self.fragments {
            let id = fragment.id.ok_or_else(|| {
                XaiApiError::IncompleteToolCall(format!("tool call at index {index} has no id"))
            })?;
            let name = fragment.name.ok_or_else(|| {
                XaiApiError::IncompleteToolCall(format!(
                    "tool call at index {index} has no function name"
                ))
            })?;

            calls.push(ToolCallDescriptor::new(id, name, fragment.arguments));
        }

        Ok(calls)
    }
}
