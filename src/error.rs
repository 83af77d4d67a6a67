use thiserror::Error;

/// Shown when the endpoint answers successfully but without a usable choice.
pub const FALLBACK_REPLY: &str = "抱歉 我没收到有效回复";

/// Prefix put in front of error descriptions that end up in the chat.
pub const ERROR_REPLY_PREFIX: &str = "出错了";

/// Failure kinds of a single completion call.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Connection failure, timeout or any other transport problem.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("response contained no choices")]
    EmptyChoice,
}

impl CompletionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network(e) if e.is_timeout())
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err)
    }
}

/// Flatten a completion result into the text the chat shows.
///
/// This is the only place errors turn into strings. Callers that need to
/// branch on the failure kind should look at the `Result` before calling it.
pub fn display_reply(result: &Result<String, CompletionError>) -> String {
    match result {
        Ok(text) => text.clone(),
        Err(CompletionError::EmptyChoice) => FALLBACK_REPLY.to_string(),
        Err(err) => format!("{ERROR_REPLY_PREFIX} {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_passes_through_verbatim() {
        let result = Ok("  嗯\n".to_string());
        assert_eq!(display_reply(&result), "  嗯\n");
    }

    #[test]
    fn empty_choice_uses_fallback() {
        assert_eq!(display_reply(&Err(CompletionError::EmptyChoice)), FALLBACK_REPLY);
    }

    #[test]
    fn http_error_embeds_status() {
        let err = CompletionError::Http {
            status: reqwest::StatusCode::UNAUTHORIZED,
            body: "bad key".to_string(),
        };
        let shown = display_reply(&Err(err));
        assert!(shown.starts_with(ERROR_REPLY_PREFIX));
        assert!(shown.contains("401"));
        assert!(shown.contains("bad key"));
    }

    #[test]
    fn parse_error_embeds_description() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let shown = display_reply(&Err(CompletionError::from(err)));
        assert!(shown.starts_with(ERROR_REPLY_PREFIX));
        assert!(shown.contains("malformed response"));
    }
}
