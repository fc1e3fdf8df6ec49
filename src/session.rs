use std::fmt;

use xai_api::{
    ChatMessage, ChatRequest, StreamEvent, ToolCallAccumulator, XaiApiClient, XaiApiConfig,
    XaiApiError,
};

use crate::history::{ConversationHistory, DEFAULT_BYTE_THRESHOLD};
use crate::model::DEFAULT_MODEL;
use crate::tools::ToolDispatcher;

/// Tool-call round trips allowed within one user turn before giving up.
pub const DEFAULT_MAX_TOOL_TURNS: usize = 25;

/// Per-session settings. The model lives here, never in process globals.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub model: String,
    pub max_tokens: u32,
    pub history_threshold: usize,
    pub max_tool_turns: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: xai_api::payload::DEFAULT_MAX_TOKENS,
            history_threshold: DEFAULT_BYTE_THRESHOLD,
            max_tool_turns: DEFAULT_MAX_TOOL_TURNS,
        }
    }
}

impl SessionConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tool_turns(mut self, max_tool_turns: usize) -> Self {
        self.max_tool_turns = max_tool_turns;
        self
    }

    pub fn with_history_threshold(mut self, history_threshold: usize) -> Self {
        self.history_threshold = history_threshold;
        self
    }
}

#[derive(Debug)]
pub enum SessionError {
    Transport(XaiApiError),
    IncompleteToolCall(String),
    ToolTurnLimit(usize),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(error) => write!(f, "transport error: {error}"),
            Self::IncompleteToolCall(message) => {
                write!(f, "incomplete tool call: {message}")
            }
            Self::ToolTurnLimit(limit) => {
                write!(f, "tool-call limit exceeded after {limit} rounds")
            }
        }
    }
}

impl std::error::Error for SessionError {}

impl From<XaiApiError> for SessionError {
    fn from(error: XaiApiError) -> Self {
        match error {
            XaiApiError::IncompleteToolCall(message) => Self::IncompleteToolCall(message),
            other => Self::Transport(other),
        }
    }
}

/// Transport seam for one streamed model turn.
pub trait TurnTransport {
    fn stream_turn(
        &self,
        request: &ChatRequest,
        on_event: &mut dyn FnMut(StreamEvent),
    ) -> Result<(), XaiApiError>;
}

/// Real transport: drives the async client on a local current-thread runtime.
pub struct HttpTurnTransport {
    client: XaiApiClient,
}

impl HttpTurnTransport {
    pub fn new(config: XaiApiConfig) -> Result<Self, XaiApiError> {
        Ok(Self {
            client: XaiApiClient::new(config)?,
        })
    }
}

impl TurnTransport for HttpTurnTransport {
    fn stream_turn(
        &self,
        request: &ChatRequest,
        on_event: &mut dyn FnMut(StreamEvent),
    ) -> Result<(), XaiApiError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                XaiApiError::Unknown(format!("failed to initialize tokio runtime: {error}"))
            })?;

        runtime
            .block_on(
                self.client
                    .stream_with_handler(request, |event| on_event(event)),
            )
            .map(|_done| ())
    }
}

/// One interactive conversation: owns the history, drives turns, and routes
/// completed tool calls to the dispatcher until a plain-text answer arrives.
pub struct Session {
    transport: Box<dyn TurnTransport>,
    dispatcher: Box<dyn ToolDispatcher>,
    config: SessionConfig,
    history: ConversationHistory,
}

impl Session {
    pub fn new(
        transport: Box<dyn TurnTransport>,
        dispatcher: Box<dyn ToolDispatcher>,
        config: SessionConfig,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            dispatcher,
            config,
            history: ConversationHistory::new(system_instruction),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.config.model = model.into();
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Send one user message and run the turn to a final textual answer.
    pub fn send_turn(&mut self, user_text: &str) -> Result<String, SessionError> {
        self.send_turn_with(user_text, &mut |_| {})
    }

    /// Like [`Session::send_turn`], streaming text deltas into `sink` as
    /// they arrive.
    ///
    /// A transport failure aborts the current turn only; the history keeps
    /// the user entry and any completed tool exchanges, so the caller may
    /// retry. Tool rounds are bounded by `max_tool_turns`.
    pub fn send_turn_with(
        &mut self,
        user_text: &str,
        sink: &mut dyn FnMut(&str),
    ) -> Result<String, SessionError> {
        self.history.push(ChatMessage::user(user_text));

        for _ in 0..self.config.max_tool_turns {
            let request = self.build_request();

            let mut answer = String::new();
            let mut accumulator = ToolCallAccumulator::default();
            self.transport.stream_turn(&request, &mut |event| {
                match event {
                    StreamEvent::TextDelta { text } => {
                        sink(&text);
                        answer.push_str(&text);
                    }
                    StreamEvent::ToolCallDelta(delta) => {
                        accumulator.apply(&delta);
                    }
                    // Decode errors are skipped lines, not turn failures.
                    StreamEvent::Done | StreamEvent::DecodeError { .. } => {}
                }
            })?;

            if accumulator.is_empty() {
                self.history.push(ChatMessage::assistant(answer.clone()));
                self.history.truncate_if_over(self.config.history_threshold);
                return Ok(answer);
            }

            let calls = accumulator.finish()?;
            let streamed_text = if answer.is_empty() {
                None
            } else {
                Some(answer)
            };
            self.history
                .push(ChatMessage::assistant_tool_calls(streamed_text, calls.clone()));

            for call in &calls {
                let result = self
                    .dispatcher
                    .execute(&call.function.name, &call.function.arguments);
                self.history.push(ChatMessage::tool(call.id.clone(), result));
            }

            self.history.truncate_if_over(self.config.history_threshold);
        }

        Err(SessionError::ToolTurnLimit(self.config.max_tool_turns))
    }

    fn build_request(&self) -> ChatRequest {
        let mut request = ChatRequest::new(
            self.config.model.clone(),
            self.history.build_request_messages().to_vec(),
        );
        request.max_tokens = self.config.max_tokens;
        request.tools = self.dispatcher.tool_schemas();
        if !request.tools.is_empty() {
            request.tool_choice = Some("auto".to_string());
        }
        request
    }
}
