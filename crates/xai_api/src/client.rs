use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};

use crate::config::XaiApiConfig;
use crate::error::{parse_error_message, XaiApiError};
use crate::events::StreamEvent;
use crate::headers::build_headers;
use crate::payload::ChatRequest;
use crate::retry::{is_retryable_http_error, retry_delay, MAX_RETRIES};
use crate::sse::SseStreamParser;
use crate::url::normalize_chat_url;

/// Collected outcome of a fully drained stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamResult {
    pub events: Vec<StreamEvent>,
    /// Whether the `[DONE]` sentinel was observed before the body ended.
    pub done: bool,
}

/// Streaming HTTP client for the xAI chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct XaiApiClient {
    http: Client,
    config: XaiApiConfig,
}

impl XaiApiClient {
    pub fn new(config: XaiApiConfig) -> Result<Self, XaiApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &XaiApiConfig {
        &self.config
    }

    /// Fully normalized chat-completions endpoint for this client.
    pub fn endpoint(&self) -> String {
        normalize_chat_url(&self.config.base_url)
    }

    /// Copy of `request` with transport invariants enforced: streaming is
    /// always on, and tool-capable requests default to `"auto"` tool choice.
    pub fn request_with_transport_defaults(&self, request: &ChatRequest) -> ChatRequest {
        let mut request = request.clone();
        request.stream = true;
        if !request.tools.is_empty() && request.tool_choice.is_none() {
            request.tool_choice = Some("auto".to_string());
        }
        request
    }

    fn header_map(&self) -> Result<HeaderMap, XaiApiError> {
        let mut map = HeaderMap::new();
        for (key, value) in build_headers(&self.config)? {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|error| XaiApiError::Unknown(format!("invalid header {key}: {error}")))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|error| XaiApiError::Unknown(format!("invalid header {key}: {error}")))?;
            map.insert(name, value);
        }
        Ok(map)
    }

    pub fn build_request(&self, request: &ChatRequest) -> Result<RequestBuilder, XaiApiError> {
        let payload = self.request_with_transport_defaults(request);
        Ok(self
            .http
            .post(self.endpoint())
            .headers(self.header_map()?)
            .json(&payload))
    }

    /// Send the request, retrying transient failures with exponential backoff.
    ///
    /// Non-retryable statuses surface immediately as [`XaiApiError::Status`];
    /// exhausting the retry budget surfaces [`XaiApiError::RetryExhausted`]
    /// with the last observed status and message.
    async fn send_with_retry(&self, request: &ChatRequest) -> Result<Response, XaiApiError> {
        let mut last_status = None;
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                tokio::time::sleep(retry_delay(attempt - 1)).await;
            }

            let response = match self.build_request(request)?.send().await {
                Ok(response) => response,
                Err(error) => {
                    last_status = None;
                    last_error = Some(error.to_string());
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            let message = parse_error_message(status, &body);
            if !is_retryable_http_error(status.as_u16(), &message) {
                return Err(XaiApiError::Status(status, message));
            }

            last_status = Some(status);
            last_error = Some(message);
        }

        Err(XaiApiError::RetryExhausted {
            status: last_status,
            last_error,
        })
    }

    /// Stream one completion, invoking `on_event` for every normalized event
    /// as it arrives. Returns whether the `[DONE]` sentinel was observed.
    pub async fn stream_with_handler(
        &self,
        request: &ChatRequest,
        mut on_event: impl FnMut(StreamEvent),
    ) -> Result<bool, XaiApiError> {
        let response = self.send_with_retry(request).await?;

        let mut parser = SseStreamParser::default();
        let mut body = response.bytes_stream();
        let mut done = false;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for event in parser.feed(&chunk) {
                if event.is_terminal() {
                    done = true;
                }
                on_event(event);
            }
            if done {
                break;
            }
        }

        Ok(done)
    }

    /// Stream one completion and collect every event.
    pub async fn stream(&self, request: &ChatRequest) -> Result<StreamResult, XaiApiError> {
        let mut events = Vec::new();
        let done = self
            .stream_with_handler(request, |event| events.push(event))
            .await?;

        Ok(StreamResult { events, done })
    }
}
