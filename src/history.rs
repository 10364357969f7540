//! Process-wide conversation history.
//!
//! History is an append-only list of [`Exchange`]s (one user utterance and
//! the bot reply to it). Appends and snapshots happen under a single lock so
//! concurrent turns never interleave or observe a half-written exchange.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// Who said an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Bot,
}

/// A single line of conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: Speaker,
    pub text: String,
}

/// One completed turn: what the user said and what the bot answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub bot: String,
}

impl Exchange {
    /// Create an exchange from the user's transcript and the bot reply.
    pub fn new(user: impl Into<String>, bot: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            bot: bot.into(),
        }
    }

    /// The two utterances of this exchange, user first.
    pub fn utterances(&self) -> [Utterance; 2] {
        [
            Utterance {
                speaker: Speaker::User,
                text: self.user.clone(),
            },
            Utterance {
                speaker: Speaker::Bot,
                text: self.bot.clone(),
            },
        ]
    }
}

/// Ordered conversation history, oldest first.
pub type ConversationHistory = Vec<Exchange>;

/// Shared handle to the conversation history.
///
/// Cloning the handle shares the underlying history.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    inner: Arc<Mutex<ConversationHistory>>,
}

impl HistoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ConversationHistory> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Point-in-time copy of the history.
    pub fn snapshot(&self) -> ConversationHistory {
        self.lock().clone()
    }

    /// Number of exchanges recorded.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Append an exchange and return the history including it.
    pub fn append_and_snapshot(&self, exchange: Exchange) -> ConversationHistory {
        let mut history = self.lock();
        history.push(exchange);
        history.clone()
    }
}
