//! voxrelay: request/response voice relay.
//!
//! One turn takes an uploaded recording through three remote stages:
//! Audio → STT → LLM → TTS → playable audio URL
//!
//! # Architecture
//!
//! - **STT**: AssemblyAI-style upload, job submission and status polling
//! - **LLM**: OpenAI-compatible chat completions (Groq by default) with the
//!   running conversation as context
//! - **TTS**: Murf, then a local espeak-ng engine, then a static fallback clip
//! - **History**: process-wide list of exchanges shared by all turns
//!
//! Every stage failure degrades the turn instead of failing the request.

pub mod config;
pub mod error;
pub mod history;
pub mod llm;
pub mod pipeline;
pub mod server;
pub mod storage;
pub mod stt;
pub mod tts;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use history::{Exchange, HistoryStore};
pub use pipeline::TurnOrchestrator;
pub use pipeline::messages::{AudioResource, TurnResult};
pub use server::RelayServer;
pub use storage::MediaStore;
