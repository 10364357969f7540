//! Language model reply generation.
//!
//! The [`Responder`] trait is the seam the turn orchestrator calls. The
//! shipped implementation, [`api::ChatCompletionResponder`], talks to any
//! OpenAI-compatible chat completions endpoint (Groq by default).

pub mod api;

pub use api::ChatCompletionResponder;

use crate::error::ReplyError;
use crate::history::Exchange;
use async_trait::async_trait;
use serde::Serialize;

/// Produces a reply to the latest user text given prior conversation.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Generate a reply. `history` holds the exchanges before this turn.
    async fn reply(
        &self,
        history: &[Exchange],
        latest_user_text: &str,
    ) -> Result<String, ReplyError>;
}

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a chat completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Assemble the request messages: system prompt, then each prior exchange
/// as a user/assistant pair, then the latest user text.
pub fn build_messages(
    system_prompt: &str,
    history: &[Exchange],
    latest_user_text: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(ChatMessage::new(Role::System, system_prompt));
    for exchange in history {
        messages.push(ChatMessage::new(Role::User, exchange.user.as_str()));
        messages.push(ChatMessage::new(Role::Assistant, exchange.bot.as_str()));
    }
    messages.push(ChatMessage::new(Role::User, latest_user_text));
    messages
}

/// Strip `<think>...</think>` blocks from generated text.
pub fn strip_think_blocks(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut remaining = text;
    while let Some(start) = remaining.find("<think>") {
        result.push_str(&remaining[..start]);
        if let Some(end) = remaining[start..].find("</think>") {
            remaining = &remaining[start + end + "</think>".len()..];
        } else {
            // Unclosed block: drop the rest.
            return result;
        }
    }
    result.push_str(remaining);
    result
}
