//! OpenAI-compatible chat completions backend.
//!
//! Works against Groq (the default), OpenAI, or any server implementing
//! `POST /v1/chat/completions`. Requests are non-streaming: the whole reply
//! is needed before synthesis starts.

use super::{Responder, build_messages, strip_think_blocks};
use crate::config::LlmConfig;
use crate::error::{RelayError, ReplyError, Result};
use crate::history::Exchange;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// [`Responder`] that calls a chat completions API.
pub struct ChatCompletionResponder {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    system_prompt: String,
    max_tokens: u32,
    temperature: f64,
}

impl std::fmt::Debug for ChatCompletionResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionResponder")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl ChatCompletionResponder {
    /// Build a responder from config.
    ///
    /// `api_url` may be given with or without a trailing `/v1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RelayError::Http(format!("language model client: {e}")))?;

        let base = config.api_url.trim_end_matches('/');
        let base = base.strip_suffix("/v1").unwrap_or(base);

        Ok(Self {
            client,
            endpoint: format!("{base}/v1/chat/completions"),
            api_key: config.credential().map(str::to_owned),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Extract an error message from an OpenAI-style error body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl Responder for ChatCompletionResponder {
    async fn reply(
        &self,
        history: &[Exchange],
        latest_user_text: &str,
    ) -> std::result::Result<String, ReplyError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(ReplyError::MissingCredential);
        };

        let messages = build_messages(&self.system_prompt, history, latest_user_text);
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        let started = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ReplyError::Provider(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ReplyError::Provider(format!(
                "HTTP {}: {}",
                status.as_u16(),
                extract_error_message(&body_text)
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|_| ReplyError::EmptyReply)?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();
        let reply = strip_think_blocks(&content).trim().to_owned();
        if reply.is_empty() {
            return Err(ReplyError::EmptyReply);
        }

        info!(
            model = %self.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            history_len = history.len(),
            "reply generated"
        );
        Ok(reply)
    }
}
