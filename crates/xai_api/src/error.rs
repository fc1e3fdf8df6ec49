use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;
use serde_json::Value;

#[derive(Debug)]
pub enum XaiApiError {
    MissingApiKey,
    InvalidBaseUrl(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    Serde(JsonError),
    RetryExhausted {
        status: Option<StatusCode>,
        last_error: Option<String>,
    },
    /// A turn ended with a tool-call fragment missing its id or name.
    IncompleteToolCall(String),
    Unknown(String),
}

impl fmt::Display for XaiApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "API key is required"),
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::RetryExhausted { status, last_error } => {
                let status = status
                    .map(|status| status.as_u16().to_string())
                    .unwrap_or_else(|| "n/a".to_owned());
                write!(
                    f,
                    "retry exhausted after max attempts (status: {status}, last_error: {last_error:?})"
                )
            }
            Self::IncompleteToolCall(message) => {
                write!(f, "incomplete tool call: {message}")
            }
            Self::Unknown(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for XaiApiError {}

impl From<reqwest::Error> for XaiApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for XaiApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<Value>,
}

/// Extract a human-readable message from a non-success response body.
///
/// The endpoint reports failures either as `{"error": "text"}` or as
/// `{"error": {"message": "text", ...}}`; anything else falls back to the
/// raw body, then to the canonical status reason.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        if let Some(error) = payload.error {
            if let Some(message) = error.as_str() {
                return message.to_string();
            }
            if let Some(message) = error.get("message").and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }

    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::parse_error_message;
    use reqwest::StatusCode;

    #[test]
    fn string_error_bodies_are_unwrapped() {
        let message =
            parse_error_message(StatusCode::BAD_REQUEST, r#"{"error":"invalid model name"}"#);
        assert_eq!(message, "invalid model name");
    }

    #[test]
    fn object_error_bodies_use_message_field() {
        let message = parse_error_message(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"rate limit exceeded","code":"rate_limit"}}"#,
        );
        assert_eq!(message, "rate limit exceeded");
    }

    #[test]
    fn unparseable_body_is_returned_verbatim() {
        let message = parse_error_message(StatusCode::BAD_GATEWAY, "upstream connect failure");
        assert_eq!(message, "upstream connect failure");
    }

    #[test]
    fn empty_body_falls_back_to_status_reason() {
        let message = parse_error_message(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(message, "Service Unavailable");
    }
}
