//! Speech-to-text via an AssemblyAI-style asynchronous job API.
//!
//! A transcription is three steps: upload the raw audio, submit a job that
//! references the upload, then poll the job until it reaches a terminal
//! state. Polling runs at a fixed interval and gives up after a bounded
//! number of attempts.

use crate::config::SttConfig;
use crate::error::{RelayError, Result, TranscribeError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Converts recorded audio into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe `audio` (the raw bytes of an uploaded recording).
    async fn transcribe(&self, audio: &[u8]) -> std::result::Result<String, TranscribeError>;
}

/// Provider-side status of a transcription job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Map a provider status string. Unknown values count as still processing.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "queued" => Self::Queued,
            "completed" => Self::Completed,
            "error" => Self::Failed,
            _ => Self::Processing,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A job in flight. Lives only for the duration of one `transcribe` call.
#[derive(Debug, Clone)]
pub struct TranscriptionJob {
    pub id: String,
    pub source_audio_ref: String,
    pub status: JobStatus,
    pub result_text: Option<String>,
}

impl TranscriptionJob {
    fn new(id: String, source_audio_ref: String) -> Self {
        Self {
            id,
            source_audio_ref,
            status: JobStatus::Queued,
            result_text: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    upload_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// [`Transcriber`] backed by the AssemblyAI REST API.
pub struct AssemblyAiTranscriber {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl std::fmt::Debug for AssemblyAiTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssemblyAiTranscriber")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("poll_interval", &self.poll_interval)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .finish()
    }
}

impl AssemblyAiTranscriber {
    /// Build a transcriber from config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &SttConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RelayError::Http(format!("speech-to-text client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.credential().map(str::to_owned),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_poll_attempts: config.max_poll_attempts.max(1),
        })
    }

    async fn upload(
        &self,
        key: &str,
        audio: &[u8],
    ) -> std::result::Result<String, TranscribeError> {
        let url = format!("{}/v2/upload", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("authorization", key)
            .header("Content-Type", "application/octet-stream")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| TranscribeError::Upload(format!("upload request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::Upload(format!("HTTP {}: {body}", status.as_u16())));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| TranscribeError::Upload(format!("invalid upload response: {e}")))?;

        parsed
            .upload_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| TranscribeError::Upload("response carried no upload_url".into()))
    }

    async fn submit(
        &self,
        key: &str,
        upload_url: &str,
    ) -> std::result::Result<String, TranscribeError> {
        let url = format!("{}/v2/transcript", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("authorization", key)
            .json(&serde_json::json!({ "audio_url": upload_url }))
            .send()
            .await
            .map_err(|e| TranscribeError::Submission(format!("submit request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::Submission(format!(
                "HTTP {}: {body}",
                status.as_u16()
            )));
        }

        let parsed: SubmitResponse = response
            .json()
            .await
            .map_err(|e| TranscribeError::Submission(format!("invalid submit response: {e}")))?;

        parsed
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| TranscribeError::Submission("response carried no job id".into()))
    }

    async fn poll_once(
        &self,
        key: &str,
        job_id: &str,
    ) -> std::result::Result<StatusResponse, TranscribeError> {
        let url = format!("{}/v2/transcript/{job_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("authorization", key)
            .send()
            .await
            .map_err(|e| TranscribeError::Transcription(format!("status request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::Transcription(format!(
                "status HTTP {}: {body}",
                status.as_u16()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| TranscribeError::Transcription(format!("invalid status response: {e}")))
    }

    async fn wait_for_completion(
        &self,
        key: &str,
        job: &mut TranscriptionJob,
    ) -> std::result::Result<String, TranscribeError> {
        for attempt in 1..=self.max_poll_attempts {
            let polled = self.poll_once(key, &job.id).await?;
            let status = JobStatus::from_provider(&polled.status);
            if status != job.status {
                debug!(
                    job_id = %job.id,
                    from = ?job.status,
                    to = ?status,
                    attempt,
                    "job status changed"
                );
                job.status = status;
            }

            match status {
                JobStatus::Completed => {
                    let text = polled.text.unwrap_or_default();
                    job.result_text = Some(text.clone());
                    return Ok(text);
                }
                JobStatus::Failed => {
                    let detail = polled
                        .error
                        .unwrap_or_else(|| "provider reported an error".to_owned());
                    return Err(TranscribeError::Transcription(detail));
                }
                JobStatus::Queued | JobStatus::Processing => {
                    if attempt < self.max_poll_attempts {
                        tokio::time::sleep(self.poll_interval).await;
                    }
                }
            }
        }

        warn!(job_id = %job.id, attempts = self.max_poll_attempts, "transcription job timed out");
        Err(TranscribeError::Timeout {
            attempts: self.max_poll_attempts,
        })
    }
}

#[async_trait]
impl Transcriber for AssemblyAiTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> std::result::Result<String, TranscribeError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(TranscribeError::MissingCredential);
        };

        let started = Instant::now();
        let upload_url = self.upload(key, audio).await?;
        let job_id = self.submit(key, &upload_url).await?;
        let mut job = TranscriptionJob::new(job_id, upload_url);
        debug!(job_id = %job.id, source = %job.source_audio_ref, "transcription job submitted");

        let text = self.wait_for_completion(key, &mut job).await?;
        info!(
            job_id = %job.id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = text.len(),
            "transcription completed"
        );
        Ok(text)
    }
}
