//! Turn orchestrator: speech-to-text, reply, text-to-speech.
//!
//! A turn runs its stages strictly in sequence. Failures are isolated per
//! stage and turned into a degraded but well-formed [`TurnResult`]; no stage
//! error ever escapes [`TurnOrchestrator::run_turn`].

use crate::config::RelayConfig;
use crate::error::Result;
use crate::history::{Exchange, HistoryStore};
use crate::llm::{ChatCompletionResponder, Responder};
use crate::pipeline::messages::{Stage, TurnResult, TurnState};
use crate::storage::MediaStore;
use crate::stt::{AssemblyAiTranscriber, Transcriber};
use crate::tts::Synthesizer;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

/// Spoken when the language model cannot be reached, and baked into the
/// fallback clip.
pub const APOLOGY_TEXT: &str = "I'm having trouble connecting right now.";

/// Transcript reported when speech-to-text fails or hears nothing.
pub const TRANSCRIPTION_FAILED_MARKER: &str = "[Error: Could not transcribe]";

/// Transcript reported when the request could not be processed at all
/// (e.g. the upload could not be stored).
pub const REQUEST_FAILED_MARKER: &str = "[Error: Could not process request]";

/// Runs turns against shared stage implementations and history.
#[derive(Clone)]
pub struct TurnOrchestrator {
    transcriber: Arc<dyn Transcriber>,
    responder: Arc<dyn Responder>,
    synthesizer: Arc<Synthesizer>,
    history: HistoryStore,
}

impl TurnOrchestrator {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        responder: Arc<dyn Responder>,
        synthesizer: Arc<Synthesizer>,
        history: HistoryStore,
    ) -> Self {
        Self {
            transcriber,
            responder,
            synthesizer,
            history,
        }
    }

    /// Wire the provider-backed stages from config.
    ///
    /// # Errors
    ///
    /// Returns an error if any provider HTTP client cannot be constructed.
    pub fn from_config(
        config: &RelayConfig,
        media: &MediaStore,
        history: HistoryStore,
    ) -> Result<Self> {
        let transcriber = AssemblyAiTranscriber::from_config(&config.stt)?;
        let responder = ChatCompletionResponder::from_config(&config.llm)?;
        let synthesizer = Synthesizer::from_config(&config.tts, media)?;

        for (stage, configured) in [
            ("speech-to-text", config.stt.credential().is_some()),
            ("language model", config.llm.credential().is_some()),
            ("text-to-speech", config.tts.credential().is_some()),
        ] {
            if !configured {
                warn!(stage, "no credential configured, stage will degrade");
            }
        }

        Ok(Self::new(
            Arc::new(transcriber),
            Arc::new(responder),
            Arc::new(synthesizer),
            history,
        ))
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Run one turn for `audio`, speaking the reply with `voice_id`.
    pub async fn run_turn(&self, audio: &[u8], voice_id: &str) -> TurnResult {
        let turn_id = uuid::Uuid::new_v4();
        let span = info_span!("turn", %turn_id);
        self.run_turn_inner(audio, voice_id).instrument(span).await
    }

    async fn run_turn_inner(&self, audio: &[u8], voice_id: &str) -> TurnResult {
        let turn_started = Instant::now();
        let mut state = TurnState::Received;
        debug!(bytes = audio.len(), %state, "turn received");

        let started = Instant::now();
        let transcript = match self.transcriber.transcribe(audio).await {
            Ok(text) if text.trim().is_empty() => {
                state = TurnState::Failed(Stage::Transcription);
                warn!(%state, "transcription is empty");
                return self.degraded_turn(TRANSCRIPTION_FAILED_MARKER).await;
            }
            Ok(text) => text,
            Err(e) => {
                state = TurnState::Failed(Stage::Transcription);
                warn!(code = e.code(), %state, "transcription failed: {e}");
                return self.degraded_turn(TRANSCRIPTION_FAILED_MARKER).await;
            }
        };
        state = TurnState::Transcribed;
        info!(
            %state,
            elapsed_ms = started.elapsed().as_millis() as u64,
            transcript = %transcript,
            "stage complete"
        );

        let prior = self.history.snapshot();
        let started = Instant::now();
        let reply = match self.responder.reply(&prior, &transcript).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    code = e.code(),
                    stage = %Stage::Reply,
                    "reply failed, apologising: {e}"
                );
                APOLOGY_TEXT.to_owned()
            }
        };
        state = TurnState::Replied;
        info!(
            %state,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stage complete"
        );

        let history = self
            .history
            .append_and_snapshot(Exchange::new(transcript.clone(), reply.clone()));

        let started = Instant::now();
        let audio = self.synthesizer.synthesize(&reply, voice_id).await;
        state = TurnState::Synthesized;
        info!(
            %state,
            elapsed_ms = started.elapsed().as_millis() as u64,
            fallback = audio.is_static(),
            "stage complete"
        );

        state = TurnState::Complete;
        info!(
            %state,
            total_ms = turn_started.elapsed().as_millis() as u64,
            history_len = history.len(),
            "turn finished"
        );

        TurnResult {
            transcript,
            reply,
            audio_url: audio.url().to_owned(),
            history,
        }
    }

    /// Result for a turn that produced no transcript, reported as `marker`.
    /// History is untouched.
    pub async fn degraded_turn(&self, marker: &str) -> TurnResult {
        let audio = self.synthesizer.fallback_audio().await;
        TurnResult {
            transcript: marker.to_owned(),
            reply: APOLOGY_TEXT.to_owned(),
            audio_url: audio.url().to_owned(),
            history: self.history.snapshot(),
        }
    }
}

impl std::fmt::Debug for TurnOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnOrchestrator")
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}
