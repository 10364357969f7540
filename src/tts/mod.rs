//! Text-to-speech with graceful degradation.
//!
//! A [`Synthesizer`] walks an ordered list of [`SynthesisStrategy`]s and
//! stops at the first one that produces audio. If every strategy fails (or
//! the text is blank) it hands out the shared [`FallbackClip`], so callers
//! always get a playable [`AudioResource`].

pub mod fallback;
pub mod local;
pub mod remote;

pub use fallback::FallbackClip;
pub use local::{EspeakEngine, LocalSpeech};
pub use remote::MurfSpeech;

use crate::config::TtsConfig;
use crate::error::{Result, SynthesisError};
use crate::pipeline::messages::AudioResource;
use crate::storage::MediaStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of a single strategy attempt.
#[derive(Debug)]
pub enum StrategyOutcome {
    /// Audio was produced; stop here.
    Produced(AudioResource),
    /// This strategy failed; try the next one.
    Continue(SynthesisError),
}

impl From<std::result::Result<AudioResource, SynthesisError>> for StrategyOutcome {
    fn from(result: std::result::Result<AudioResource, SynthesisError>) -> Self {
        match result {
            Ok(audio) => Self::Produced(audio),
            Err(e) => Self::Continue(e),
        }
    }
}

/// One way of turning text into an audio file.
#[async_trait]
pub trait SynthesisStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Try to synthesize `text` with `voice_id`.
    async fn attempt(&self, text: &str, voice_id: &str) -> StrategyOutcome;
}

/// Ordered strategy chain ending at the static fallback clip.
pub struct Synthesizer {
    strategies: Vec<Box<dyn SynthesisStrategy>>,
    fallback: Arc<FallbackClip>,
}

impl Synthesizer {
    pub fn new(strategies: Vec<Box<dyn SynthesisStrategy>>, fallback: Arc<FallbackClip>) -> Self {
        Self {
            strategies,
            fallback,
        }
    }

    /// Remote provider, then local engine, then the static clip.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote provider's HTTP client cannot be built.
    pub fn from_config(config: &TtsConfig, media: &MediaStore) -> Result<Self> {
        let engine = EspeakEngine::new(&config.local_engine, &config.language);
        let remote = MurfSpeech::from_config(config, media.clone())?;
        let local = LocalSpeech::new(engine.clone(), media.clone());
        let fallback = FallbackClip::new(
            media.fallback_path(),
            media.public_url(&media.fallback_path()),
            Some(engine),
        );
        Ok(Self::new(
            vec![Box::new(remote), Box::new(local)],
            Arc::new(fallback),
        ))
    }

    /// Produce audio for `text`. Never fails.
    pub async fn synthesize(&self, text: &str, voice_id: &str) -> AudioResource {
        if text.trim().is_empty() {
            debug!("blank text, using fallback clip");
            return self.fallback.resource().await;
        }

        for strategy in &self.strategies {
            let started = Instant::now();
            match strategy.attempt(text, voice_id).await {
                StrategyOutcome::Produced(audio) => {
                    info!(
                        strategy = strategy.name(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        url = audio.url(),
                        "speech synthesized"
                    );
                    return audio;
                }
                StrategyOutcome::Continue(e) => {
                    warn!(
                        strategy = strategy.name(),
                        code = e.code(),
                        "synthesis strategy failed: {e}"
                    );
                }
            }
        }

        self.fallback.resource().await
    }

    /// The shared fallback clip, created on first use.
    pub async fn fallback_audio(&self) -> AudioResource {
        self.fallback.resource().await
    }
}
