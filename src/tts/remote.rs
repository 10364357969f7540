//! Remote speech synthesis via the Murf REST API.

use super::{StrategyOutcome, SynthesisStrategy};
use crate::config::TtsConfig;
use crate::error::{RelayError, Result, SynthesisError};
use crate::pipeline::messages::AudioResource;
use crate::storage::MediaStore;
use async_trait::async_trait;
use std::time::Duration;

/// Strategy that asks Murf for audio, downloads it and saves it locally.
pub struct MurfSpeech {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    format: String,
    media: MediaStore,
}

impl std::fmt::Debug for MurfSpeech {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MurfSpeech")
            .field("endpoint", &self.endpoint)
            .field("format", &self.format)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl MurfSpeech {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &TtsConfig, media: MediaStore) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RelayError::Http(format!("text-to-speech client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/v1/speech/generate",
                config.api_url.trim_end_matches('/')
            ),
            api_key: config.credential().map(str::to_owned),
            format: config.format.clone(),
            media,
        })
    }

    async fn generate(
        &self,
        text: &str,
        voice_id: &str,
    ) -> std::result::Result<AudioResource, SynthesisError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(SynthesisError::RemoteSynthesis(
                "text-to-speech credential is not configured".into(),
            ));
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", key)
            .json(&serde_json::json!({
                "text": text,
                "voiceId": voice_id,
                "format": self.format,
            }))
            .send()
            .await
            .map_err(|e| SynthesisError::RemoteSynthesis(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::RemoteSynthesis(format!(
                "HTTP {}: {body}",
                status.as_u16()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SynthesisError::RemoteSynthesis(format!("invalid response: {e}")))?;
        let audio_url = audio_url_from(&body).ok_or_else(|| {
            SynthesisError::RemoteSynthesis("response carried no audio URL".into())
        })?;

        let bytes = self.download(audio_url).await?;

        let path = self.media.new_audio_path(&self.format.to_ascii_lowercase());
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                SynthesisError::RemoteSynthesis(format!("cannot create audio dir: {e}"))
            })?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| SynthesisError::RemoteSynthesis(format!("cannot save audio: {e}")))?;

        Ok(AudioResource::Generated {
            url: self.media.public_url(&path),
            path,
        })
    }

    async fn download(&self, url: &str) -> std::result::Result<bytes::Bytes, SynthesisError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SynthesisError::RemoteSynthesis(format!("download failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SynthesisError::RemoteSynthesis(format!(
                "download HTTP {}",
                status.as_u16()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::RemoteSynthesis(format!("download body: {e}")))?;
        if bytes.is_empty() {
            return Err(SynthesisError::RemoteSynthesis("downloaded audio is empty".into()));
        }
        Ok(bytes)
    }
}

/// The provider returns the file URL as `audioFile` or `audioUrl`.
fn audio_url_from(body: &serde_json::Value) -> Option<&str> {
    ["audioFile", "audioUrl"]
        .iter()
        .filter_map(|field| body.get(field).and_then(|v| v.as_str()))
        .find(|url| !url.is_empty())
}

#[async_trait]
impl SynthesisStrategy for MurfSpeech {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn attempt(&self, text: &str, voice_id: &str) -> StrategyOutcome {
        self.generate(text, voice_id).await.into()
    }
}
