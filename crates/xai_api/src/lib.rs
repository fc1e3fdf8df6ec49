//! Transport-only xAI chat-completions client primitives.
//!
//! This crate owns request building, header construction, SSE stream parsing,
//! and tool-call fragment accumulation for the xAI streaming endpoint. It
//! intentionally contains no conversation state and no tool implementations;
//! those live with the host.
//!
//! Stream normalization maps raw `data:` lines into [`StreamEvent`] values,
//! preserving malformed lines as [`StreamEvent::DecodeError`] so a single bad
//! chunk never aborts the stream.

pub mod accumulator;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod retry;
pub mod sse;
pub mod url;

pub use accumulator::{ToolCallAccumulator, ToolCallFragment};
pub use client::{StreamResult, XaiApiClient};
pub use config::XaiApiConfig;
pub use error::XaiApiError;
pub use events::{StreamEvent, ToolCallDelta};
pub use payload::{ChatMessage, ChatRequest, Role, ToolCallDescriptor};
pub use sse::SseStreamParser;
pub use url::normalize_chat_url;
