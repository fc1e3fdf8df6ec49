use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use grok_terminal::{Session, SessionConfig, ToolDispatcher, TurnTransport};
use xai_api::{ChatRequest, Role, SseStreamParser, StreamEvent, XaiApiError};

/// Transport that replays canned SSE bodies through the real parser, one
/// body per turn, delivering bytes in small uneven chunks.
struct SseReplayTransport {
    bodies: Mutex<VecDeque<&'static str>>,
    observed_requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl SseReplayTransport {
    fn new(bodies: Vec<&'static str>) -> Box<Self> {
        Self::with_request_log(bodies).0
    }

    fn with_request_log(
        bodies: Vec<&'static str>,
    ) -> (Box<Self>, Arc<Mutex<Vec<ChatRequest>>>) {
        let observed_requests = Arc::new(Mutex::new(Vec::new()));
        let transport = Box::new(Self {
            bodies: Mutex::new(bodies.into()),
            observed_requests: Arc::clone(&observed_requests),
        });
        (transport, observed_requests)
    }
}

impl TurnTransport for SseReplayTransport {
    fn stream_turn(
        &self,
        request: &ChatRequest,
        on_event: &mut dyn FnMut(StreamEvent),
    ) -> Result<(), XaiApiError> {
        self.observed_requests
            .lock()
            .expect("requests lock")
            .push(request.clone());

        let body = self
            .bodies
            .lock()
            .expect("bodies lock")
            .pop_front()
            .expect("scripted body available");

        let mut parser = SseStreamParser::default();
        for chunk in body.as_bytes().chunks(7) {
            for event in parser.feed(chunk) {
                on_event(event);
            }
        }

        Ok(())
    }
}

struct ListingDispatcher {
    executed: Mutex<Vec<(String, String)>>,
}

impl ListingDispatcher {
    fn new() -> Box<Self> {
        Box::new(Self {
            executed: Mutex::new(Vec::new()),
        })
    }
}

impl ToolDispatcher for ListingDispatcher {
    fn execute(&mut self, name: &str, arguments_json: &str) -> String {
        self.executed
            .lock()
            .expect("executed lock")
            .push((name.to_string(), arguments_json.to_string()));

        match name {
            "list_dir" => "[FILE] a.txt (3 bytes)\n[FILE] b.txt (5 bytes)".to_string(),
            _ => format!("Error: Unknown tool '{name}'"),
        }
    }

    fn tool_schemas(&self) -> Vec<serde_json::Value> {
        vec![serde_json::json!({
            "type": "function",
            "function": {
                "name": "list_dir",
                "description": "List the visible entries of a directory",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "dirpath": {"type": "string"}
                    },
                    "required": ["dirpath"]
                }
            }
        })]
    }
}

const TOOL_CALL_BODY: &str = concat!(
    "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",",
    "\"function\":{\"name\":\"list_dir\",\"arguments\":\"\"}}]}}]}\n",
    "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,",
    "\"function\":{\"arguments\":\"{\\\"dirpath\\\":\\\".\\\"}\"}}]}}]}\n",
    "data: [DONE]\n",
);

const FINAL_ANSWER_BODY: &str = concat!(
    "data: {\"choices\":[{\"delta\":{\"content\":\"There are \"}}]}\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"two files.\"}}]}\n",
    "data: [DONE]\n",
);

#[test]
fn list_files_turn_runs_tool_then_returns_final_answer() {
    let transport = SseReplayTransport::new(vec![TOOL_CALL_BODY, FINAL_ANSWER_BODY]);
    let mut session = Session::new(
        transport,
        ListingDispatcher::new(),
        SessionConfig::default(),
        "You are helpful.",
    );

    let mut streamed = String::new();
    let answer = session
        .send_turn_with("list files", &mut |delta| streamed.push_str(delta))
        .expect("turn completes");

    assert_eq!(answer, "There are two files.");
    assert_eq!(streamed, answer);

    // Beyond the system entry: user, assistant tool call, tool result,
    // final assistant answer.
    let messages = session.history().build_request_messages();
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[1].role, Role::User);
    assert_eq!(messages[1].content.as_deref(), Some("list files"));

    assert_eq!(messages[2].role, Role::Assistant);
    let calls = messages[2].tool_calls.as_ref().expect("tool calls recorded");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "call_1");
    assert_eq!(calls[0].function.name, "list_dir");
    assert_eq!(calls[0].function.arguments, "{\"dirpath\":\".\"}");

    assert_eq!(messages[3].role, Role::Tool);
    assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(
        messages[3].content.as_deref(),
        Some("[FILE] a.txt (3 bytes)\n[FILE] b.txt (5 bytes)")
    );

    assert_eq!(messages[4].role, Role::Assistant);
    assert_eq!(messages[4].content.as_deref(), Some("There are two files."));
}

#[test]
fn requests_advertise_tools_with_auto_choice() {
    let (transport, requests) = SseReplayTransport::with_request_log(vec![FINAL_ANSWER_BODY]);
    let mut session = Session::new(
        transport,
        ListingDispatcher::new(),
        SessionConfig::default(),
        "You are helpful.",
    );

    session.send_turn("hello").expect("turn completes");

    let requests = requests.lock().expect("requests lock");
    assert_eq!(requests.len(), 1);

    let request = &requests[0];
    assert!(request.stream);
    assert_eq!(request.model, grok_terminal::DEFAULT_MODEL);
    assert_eq!(request.tool_choice.as_deref(), Some("auto"));
    assert_eq!(request.tools.len(), 1);
    assert_eq!(request.tools[0]["function"]["name"], "list_dir");
    assert_eq!(request.messages[0].role, Role::System);
}

#[test]
fn malformed_stream_line_does_not_break_the_turn() {
    const NOISY_BODY: &str = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Fine \"}}]}\n",
        "data: {broken json\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"anyway.\"}}]}\n",
        "data: [DONE]\n",
    );

    let transport = SseReplayTransport::new(vec![NOISY_BODY]);
    let mut session = Session::new(
        transport,
        ListingDispatcher::new(),
        SessionConfig::default(),
        "You are helpful.",
    );

    let answer = session.send_turn("hello").expect("turn completes");
    assert_eq!(answer, "Fine anyway.");
}

#[test]
fn long_sessions_truncate_history_but_keep_the_system_entry() {
    let bodies = vec![FINAL_ANSWER_BODY; 6];
    let transport = SseReplayTransport::new(bodies);
    let mut session = Session::new(
        transport,
        ListingDispatcher::new(),
        SessionConfig::default().with_history_threshold(1),
        "You are helpful.",
    );

    for turn in 0..6 {
        session
            .send_turn(&format!("question {turn}"))
            .expect("turn completes");
    }

    // Each truncation retains the system entry plus the four most recent
    // messages.
    let messages = session.history().build_request_messages();
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[4].content.as_deref(), Some("There are two files."));
}
