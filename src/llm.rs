use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{Config, SamplingConfig};
use crate::conversation::Message;
use crate::error::CompletionError;
use crate::secrets::ApiKey;

/// Anything that can turn a transcript into one assistant reply
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, CompletionError>;
}

/// Request body for the chat-completions endpoint
#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Non-streaming client for an OpenAI-compatible chat-completions endpoint.
///
/// Each call is a single POST with no retry. The configured timeout covers
/// the whole request including reading the body.
#[derive(Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    sampling: SamplingConfig,
    api_key: ApiKey,
}

impl CompletionClient {
    /// Build a client whose every request is bounded by `timeout`
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        sampling: SamplingConfig,
        timeout: Duration,
        api_key: ApiKey,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            sampling,
            api_key,
        })
    }

    pub fn from_config(config: &Config, api_key: ApiKey) -> anyhow::Result<Self> {
        Self::new(
            config.endpoint.clone(),
            config.model.clone(),
            config.sampling.clone(),
            config.timeout(),
            api_key,
        )
    }

    /// Build the request body for a transcript
    pub fn request<'a>(&'a self, messages: &'a [Message]) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.sampling.max_tokens,
            temperature: self.sampling.temperature,
            top_p: self.sampling.top_p,
            stream: false,
        }
    }

    /// Send the transcript and return the first choice's content verbatim
    pub async fn complete(&self, messages: &[Message]) -> Result<String, CompletionError> {
        let payload = self.request(messages);
        tracing::debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            messages = messages.len(),
            "sending completion request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key.expose()))
            .header(ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(%status, "completion endpoint returned an error");
            return Err(CompletionError::Http {
                status,
                body: truncate(&body, 300),
            });
        }

        let parsed: CompletionResponse = serde_json::from_str(&body)?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(CompletionError::EmptyChoice)?;

        tracing::debug!(chars = reply.chars().count(), "completion received");
        Ok(reply)
    }
}

#[async_trait]
impl ChatBackend for CompletionClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, CompletionError> {
        CompletionClient::complete(self, messages).await
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ConversationLog, Role};

    fn client() -> CompletionClient {
        CompletionClient::new(
            "http://localhost:9/v1/chat/completions",
            "meta/test-model",
            SamplingConfig::default(),
            Duration::from_secs(30),
            ApiKey::new("k"),
        )
        .unwrap()
    }

    #[test]
    fn request_body_has_fixed_parameters() {
        let mut log = ConversationLog::initialize("persona");
        log.append(Role::User, "你好");
        let client = client();

        let body = serde_json::to_value(client.request(log.messages())).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "meta/test-model",
                "messages": [
                    {"role": "system", "content": "persona"},
                    {"role": "user", "content": "你好"},
                ],
                "max_tokens": 512,
                "temperature": 0.9,
                "top_p": 1.0,
                "stream": false,
            })
        );
    }

    #[test]
    fn from_config_carries_configured_sampling() {
        let mut config = Config::default();
        config.model = "meta/other".to_string();
        config.sampling.max_tokens = 64;

        let client = CompletionClient::from_config(&config, ApiKey::new("k")).unwrap();
        let body = serde_json::to_value(client.request(&[])).unwrap();
        assert_eq!(body["model"], "meta/other");
        assert_eq!(body["max_tokens"], 64);
        assert_eq!(body["temperature"], 0.9);
    }

    #[test]
    fn missing_choices_key_parses_as_empty() {
        let parsed: CompletionResponse = serde_json::from_str("{\"id\": \"x\"}").unwrap();
        assert!(parsed.choices.is_empty());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("琥珀琥珀", 2), "琥珀…");
        assert_eq!(truncate("short", 10), "short");
    }
}
