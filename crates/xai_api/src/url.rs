/// Default base URL for xAI transport requests.
pub const DEFAULT_XAI_BASE_URL: &str = "https://api.x.ai/v1";

/// Normalize a base URL to a chat-completions endpoint.
///
/// Normalization rules:
/// 1) keep `/chat/completions` unchanged
/// 2) append `/completions` when path ends in `/chat`
/// 3) append `/chat/completions` otherwise
pub fn normalize_chat_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_XAI_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        return trimmed.to_string();
    }
    if trimmed.ends_with("/chat") {
        return format!("{trimmed}/completions");
    }
    format!("{trimmed}/chat/completions")
}

#[cfg(test)]
mod tests {
    use super::{normalize_chat_url, DEFAULT_XAI_BASE_URL};

    #[test]
    fn empty_input_uses_default_base() {
        assert_eq!(
            normalize_chat_url(""),
            format!("{DEFAULT_XAI_BASE_URL}/chat/completions")
        );
    }

    #[test]
    fn complete_endpoint_is_kept() {
        assert_eq!(
            normalize_chat_url("https://api.x.ai/v1/chat/completions/"),
            "https://api.x.ai/v1/chat/completions"
        );
    }

    #[test]
    fn chat_suffix_gains_completions() {
        assert_eq!(
            normalize_chat_url("https://api.x.ai/v1/chat"),
            "https://api.x.ai/v1/chat/completions"
        );
    }

    #[test]
    fn bare_base_gains_full_path() {
        assert_eq!(
            normalize_chat_url("https://proxy.internal/v1/"),
            "https://proxy.internal/v1/chat/completions"
        );
    }
}
