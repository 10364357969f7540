//! The shared pre-rendered fallback clip.
//!
//! Created lazily the first time it is needed: spoken apology from the
//! local engine when available, otherwise a short silent WAV. Once the file
//! exists it is reused as-is.

use super::local::EspeakEngine;
use crate::pipeline::coordinator::APOLOGY_TEXT;
use crate::pipeline::messages::AudioResource;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

const SILENT_SAMPLE_RATE: u32 = 16_000;
const SILENT_DURATION_MS: u32 = 500;

/// Terminal synthesis step: always yields the same static clip.
#[derive(Debug)]
pub struct FallbackClip {
    path: PathBuf,
    url: String,
    engine: Option<EspeakEngine>,
    // Serializes first-time creation.
    init: Mutex<()>,
}

impl FallbackClip {
    pub fn new(
        path: impl Into<PathBuf>,
        url: impl Into<String>,
        engine: Option<EspeakEngine>,
    ) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
            engine,
            init: Mutex::new(()),
        }
    }

    /// The clip, creating it on first call.
    pub async fn resource(&self) -> AudioResource {
        self.ensure().await;
        AudioResource::Static {
            path: self.path.clone(),
            url: self.url.clone(),
        }
    }

    async fn ensure(&self) {
        let _guard = self.init.lock().await;
        if clip_exists(&self.path).await {
            return;
        }

        if let Some(engine) = &self.engine {
            match engine.render(APOLOGY_TEXT, &self.path).await {
                Ok(()) => {
                    info!(path = %self.path.display(), "fallback clip rendered");
                    return;
                }
                Err(e) => warn!(
                    code = e.code(),
                    "fallback clip render failed, writing silence: {e}"
                ),
            }
        }

        let path = self.path.clone();
        let written = tokio::task::spawn_blocking(move || write_silent_wav(&path)).await;
        match written {
            Ok(Ok(())) => info!(path = %self.path.display(), "silent fallback clip written"),
            Ok(Err(e)) => error!(path = %self.path.display(), "cannot write fallback clip: {e}"),
            Err(e) => error!("fallback clip task failed: {e}"),
        }
    }
}

async fn clip_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Write a short mono 16-bit silent WAV. The samples go to a scratch file
/// next to `path` that only replaces it once complete.
fn write_silent_wav(path: &Path) -> Result<(), hound::Error> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let scratch = tempfile::Builder::new()
        .prefix(".fallback-")
        .suffix(".wav")
        .tempfile_in(dir)?;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SILENT_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::new(BufWriter::new(scratch.as_file()), spec)?;
    let samples = SILENT_SAMPLE_RATE * SILENT_DURATION_MS / 1000;
    for _ in 0..samples {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;

    scratch.persist(path).map_err(|e| hound::Error::IoError(e.error))?;
    Ok(())
}
