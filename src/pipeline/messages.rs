//! Values passed between pipeline stages and returned to callers.

use crate::history::ConversationHistory;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// The playable audio produced for a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioResource {
    /// A file synthesized for this turn (remote download or local engine).
    Generated {
        /// Where the file lives on disk.
        path: PathBuf,
        /// Public URL for the file.
        url: String,
    },
    /// The shared pre-rendered fallback clip.
    Static {
        /// Where the clip lives on disk.
        path: PathBuf,
        /// Public URL for the clip.
        url: String,
    },
}

impl AudioResource {
    /// Public reference to hand back to the caller.
    pub fn url(&self) -> &str {
        match self {
            Self::Generated { url, .. } | Self::Static { url, .. } => url,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Generated { path, .. } | Self::Static { path, .. } => path,
        }
    }

    /// Whether this is the shared fallback clip.
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static { .. })
    }
}

/// Everything returned to the caller for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnResult {
    /// What the user said, or a fixed marker when transcription failed.
    pub transcript: String,
    /// The bot reply, or the apology text.
    pub reply: String,
    /// Public URL of the reply audio.
    pub audio_url: String,
    /// Conversation history after this turn.
    pub history: ConversationHistory,
}

/// Stages whose failure is reported in logs. Synthesis always ends in audio,
/// so it never appears here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Transcription,
    Reply,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transcription => "transcription",
            Self::Reply => "reply",
        };
        f.write_str(name)
    }
}

/// Progress of a single turn.
///
/// `Received → Transcribed → Replied → Synthesized → Complete`, with an
/// early `Failed` exit from `Received` or `Transcribed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Received,
    Transcribed,
    Replied,
    Synthesized,
    Complete,
    Failed(Stage),
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => f.write_str("received"),
            Self::Transcribed => f.write_str("transcribed"),
            Self::Replied => f.write_str("replied"),
            Self::Synthesized => f.write_str("synthesized"),
            Self::Complete => f.write_str("complete"),
            Self::Failed(stage) => write!(f, "failed({stage})"),
        }
    }
}
