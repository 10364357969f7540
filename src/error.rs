//! Error types for the voxrelay pipeline.
//!
//! Each pipeline stage has its own error enum so the turn orchestrator can
//! match on the failure kind. Stage errors carry a stable code
//! (SCREAMING_SNAKE_CASE) used in logs, accessible via `code()`.

/// Top-level error type for the relay service.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Media storage error (uploads, generated audio).
    #[error("storage error: {0}")]
    Storage(String),

    /// Outbound HTTP client construction error.
    #[error("HTTP client error: {0}")]
    Http(String),

    /// Inbound server error (bind, serve).
    #[error("server error: {0}")]
    Server(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Stable codes for stage failures.
pub mod error_codes {
    /// No credential configured for the stage's provider.
    pub const MISSING_CREDENTIAL: &str = "MISSING_CREDENTIAL";
    /// The provider rejected the audio bytes or returned no upload reference.
    pub const UPLOAD_FAILURE: &str = "UPLOAD_FAILURE";
    /// The provider returned no transcription job id.
    pub const SUBMISSION_FAILURE: &str = "SUBMISSION_FAILURE";
    /// The transcription job failed or could not be polled.
    pub const TRANSCRIPTION_FAILURE: &str = "TRANSCRIPTION_FAILURE";
    /// The transcription job never reached a terminal state.
    pub const TRANSCRIPTION_TIMEOUT: &str = "TRANSCRIPTION_TIMEOUT";
    /// Transport error or non-success status from the language model.
    pub const PROVIDER_FAILURE: &str = "PROVIDER_FAILURE";
    /// Success status but no usable reply content.
    pub const EMPTY_REPLY_FAILURE: &str = "EMPTY_REPLY_FAILURE";
    /// Remote text-to-speech failed.
    pub const REMOTE_SYNTHESIS_FAILURE: &str = "REMOTE_SYNTHESIS_FAILURE";
    /// Local text-to-speech failed.
    pub const LOCAL_SYNTHESIS_FAILURE: &str = "LOCAL_SYNTHESIS_FAILURE";
}

/// Speech-to-text stage failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscribeError {
    /// No speech-to-text credential configured.
    #[error("[{}] speech-to-text credential is not configured", error_codes::MISSING_CREDENTIAL)]
    MissingCredential,

    /// Audio upload was rejected or returned no reference.
    #[error("[{}] {}", error_codes::UPLOAD_FAILURE, .0)]
    Upload(String),

    /// Job submission returned no job id.
    #[error("[{}] {}", error_codes::SUBMISSION_FAILURE, .0)]
    Submission(String),

    /// The provider reported the job as failed, or polling broke down.
    #[error("[{}] {}", error_codes::TRANSCRIPTION_FAILURE, .0)]
    Transcription(String),

    /// The job was still pending after the poll budget was spent.
    #[error("[{}] job still pending after {attempts} polls", error_codes::TRANSCRIPTION_TIMEOUT)]
    Timeout {
        /// Number of status polls made before giving up.
        attempts: u32,
    },
}

impl TranscribeError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => error_codes::MISSING_CREDENTIAL,
            Self::Upload(_) => error_codes::UPLOAD_FAILURE,
            Self::Submission(_) => error_codes::SUBMISSION_FAILURE,
            Self::Transcription(_) => error_codes::TRANSCRIPTION_FAILURE,
            Self::Timeout { .. } => error_codes::TRANSCRIPTION_TIMEOUT,
        }
    }
}

/// Language model stage failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplyError {
    /// No language model credential configured.
    #[error("[{}] language model credential is not configured", error_codes::MISSING_CREDENTIAL)]
    MissingCredential,

    /// Transport error or non-success HTTP status.
    #[error("[{}] {}", error_codes::PROVIDER_FAILURE, .0)]
    Provider(String),

    /// The provider answered 2xx without usable content.
    #[error("[{}] provider returned no reply content", error_codes::EMPTY_REPLY_FAILURE)]
    EmptyReply,
}

impl ReplyError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => error_codes::MISSING_CREDENTIAL,
            Self::Provider(_) => error_codes::PROVIDER_FAILURE,
            Self::EmptyReply => error_codes::EMPTY_REPLY_FAILURE,
        }
    }
}

/// Text-to-speech strategy failures. Never surfaced past the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    /// The remote provider could not produce a saved audio file.
    #[error("[{}] {}", error_codes::REMOTE_SYNTHESIS_FAILURE, .0)]
    RemoteSynthesis(String),

    /// The offline engine could not produce an audio file.
    #[error("[{}] {}", error_codes::LOCAL_SYNTHESIS_FAILURE, .0)]
    LocalSynthesis(String),
}

impl SynthesisError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RemoteSynthesis(_) => error_codes::REMOTE_SYNTHESIS_FAILURE,
            Self::LocalSynthesis(_) => error_codes::LOCAL_SYNTHESIS_FAILURE,
        }
    }
}
