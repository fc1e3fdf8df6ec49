//! Streaming Grok chat sessions with model-driven local tools.
//!
//! The transport lives in the `xai_api` crate; this crate owns the
//! conversation: a size-bounded history, the turn orchestration loop that
//! alternates model output with local tool execution, and the built-in
//! file, directory, and shell tools.

pub mod history;
pub mod model;
pub mod session;
pub mod tools;

pub use history::ConversationHistory;
pub use model::{find_preset, next_model, ModelPreset, DEFAULT_MODEL, MODEL_PRESETS};
pub use session::{
    HttpTurnTransport, Session, SessionConfig, SessionError, TurnTransport,
    DEFAULT_MAX_TOOL_TURNS,
};
pub use tools::{builtin_tool_schemas, BuiltinToolDispatcher, ToolDispatcher};
