//! Offline speech synthesis through an espeak-ng compatible executable.

use super::{StrategyOutcome, SynthesisStrategy};
use crate::error::SynthesisError;
use crate::pipeline::messages::AudioResource;
use crate::storage::MediaStore;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Command;

const MAX_TEXT_CHARS: usize = 10_000;

/// Runs `<program> -v <language> -w <out.wav> <text>`.
#[derive(Debug, Clone)]
pub struct EspeakEngine {
    program: PathBuf,
    language: String,
}

impl EspeakEngine {
    pub fn new(program: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            language: language.into(),
        }
    }

    /// Render `text` to a WAV file at `out`.
    ///
    /// Output is written to a scratch file next to `out` and moved into
    /// place only when the engine succeeds, so `out` is never left half
    /// written.
    pub async fn render(&self, text: &str, out: &Path) -> Result<(), SynthesisError> {
        let text = sanitize_text(text);
        if text.is_empty() {
            return Err(SynthesisError::LocalSynthesis(
                "text is empty after sanitization".into(),
            ));
        }

        let engine = self.clone();
        let out = out.to_path_buf();
        tokio::task::spawn_blocking(move || engine.render_blocking(&text, &out))
            .await
            .map_err(|e| SynthesisError::LocalSynthesis(format!("render task failed: {e}")))?
    }

    fn render_blocking(&self, text: &str, out: &Path) -> Result<(), SynthesisError> {
        let dir = out
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| {
            SynthesisError::LocalSynthesis(format!("cannot create {}: {e}", dir.display()))
        })?;

        let scratch = tempfile::Builder::new()
            .prefix(".speech-")
            .suffix(".wav")
            .tempfile_in(dir)
            .map_err(|e| SynthesisError::LocalSynthesis(format!("scratch file: {e}")))?;

        let output = Command::new(&self.program)
            .arg("-v")
            .arg(&self.language)
            .arg("-w")
            .arg(scratch.path())
            .arg(text)
            .output()
            .map_err(|e| {
                SynthesisError::LocalSynthesis(format!(
                    "failed to run {}: {e}",
                    self.program.display()
                ))
            })?;

        if !output.status.success() {
            return Err(SynthesisError::LocalSynthesis(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let written = std::fs::metadata(scratch.path()).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(SynthesisError::LocalSynthesis(
                "engine produced no audio".into(),
            ));
        }

        scratch
            .persist(out)
            .map_err(|e| SynthesisError::LocalSynthesis(format!("cannot save audio: {e}")))?;
        Ok(())
    }
}

/// Drop control characters and cap the length. Text goes to the engine as a
/// single argument, never through a shell.
fn sanitize_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .take(MAX_TEXT_CHARS)
        .collect::<String>()
        .trim()
        .to_owned()
}

/// Strategy that renders speech with the local engine into the audio dir.
#[derive(Debug, Clone)]
pub struct LocalSpeech {
    engine: EspeakEngine,
    media: MediaStore,
}

impl LocalSpeech {
    pub fn new(engine: EspeakEngine, media: MediaStore) -> Self {
        Self { engine, media }
    }
}

#[async_trait]
impl SynthesisStrategy for LocalSpeech {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn attempt(&self, text: &str, _voice_id: &str) -> StrategyOutcome {
        let path = self.media.new_audio_path("wav");
        match self.engine.render(text, &path).await {
            Ok(()) => StrategyOutcome::Produced(AudioResource::Generated {
                url: self.media.public_url(&path),
                path,
            }),
            Err(e) => StrategyOutcome::Continue(e),
        }
    }
}
