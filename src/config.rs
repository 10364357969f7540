//! Configuration types for the relay service.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the speech-to-text (AssemblyAI) key.
pub const STT_API_KEY_ENV: &str = "ASSEMBLYAI_API_KEY";
/// Environment variable holding the language model (Groq) key.
pub const LLM_API_KEY_ENV: &str = "GROQ_API_KEY";
/// Environment variable holding the text-to-speech (Murf) key.
pub const TTS_API_KEY_ENV: &str = "MURF_API_KEY";

/// Top-level configuration for the relay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Inbound HTTP server settings.
    pub server: ServerConfig,
    /// Upload and generated-audio directories.
    pub storage: StorageConfig,
    /// Speech-to-text provider settings.
    pub stt: SttConfig,
    /// Language model provider settings.
    pub llm: LlmConfig,
    /// Text-to-speech provider and fallback settings.
    pub tts: TtsConfig,
}

/// Inbound HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` = auto-assign).
    pub port: u16,
    /// Maximum accepted request body in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8000,
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

/// On-disk locations for uploads, generated audio and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Where uploaded recordings are kept.
    pub uploads_dir: PathBuf,
    /// Where synthesized audio (and the fallback clip) is written and served from.
    pub audio_dir: PathBuf,
    /// URL prefix under which `audio_dir` is served.
    pub public_prefix: String,
    /// Directory for the rolling log file.
    pub logs_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            audio_dir: PathBuf::from("static"),
            public_prefix: "/static".to_owned(),
            logs_dir: PathBuf::from("logs"),
        }
    }
}

/// Speech-to-text configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// Provider base URL.
    pub api_url: String,
    /// API key. Usually taken from `ASSEMBLYAI_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Delay between job status polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Polls made before the job is abandoned as timed out.
    pub max_poll_attempts: u32,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.assemblyai.com".to_owned(),
            api_key: None,
            poll_interval_ms: 2_000,
            // 5 minutes at the default interval
            max_poll_attempts: 150,
            request_timeout_secs: 30,
        }
    }
}

/// Language model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API (without `/v1`).
    pub api_url: String,
    /// API key. Usually taken from `GROQ_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model identifier.
    pub model: String,
    /// System instruction placed before the conversation.
    pub system_prompt: String,
    /// Upper bound on reply length.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai".to_owned(),
            api_key: None,
            model: "llama-3.3-70b-versatile".to_owned(),
            system_prompt: "You are a helpful AI assistant.".to_owned(),
            max_tokens: 500,
            temperature: 0.7,
            request_timeout_secs: 30,
        }
    }
}

/// Text-to-speech configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Remote provider base URL.
    pub api_url: String,
    /// API key. Usually taken from `MURF_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Voice used when the caller does not pick one.
    pub default_voice_id: String,
    /// Audio format requested from the remote provider.
    pub format: String,
    /// Offline synthesizer executable (espeak-ng compatible CLI).
    pub local_engine: String,
    /// Language passed to the offline synthesizer.
    pub language: String,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.murf.ai".to_owned(),
            api_key: None,
            default_voice_id: "en-US-charles".to_owned(),
            format: "MP3".to_owned(),
            local_engine: "espeak-ng".to_owned(),
            language: "en".to_owned(),
            request_timeout_secs: 60,
        }
    }
}

/// Return the key if it is set and not blank.
fn usable_key(key: Option<&String>) -> Option<&str> {
    key.map(String::as_str).filter(|k| !k.trim().is_empty())
}

impl SttConfig {
    /// The configured credential, if usable.
    pub fn credential(&self) -> Option<&str> {
        usable_key(self.api_key.as_ref())
    }
}

impl LlmConfig {
    /// The configured credential, if usable.
    pub fn credential(&self) -> Option<&str> {
        usable_key(self.api_key.as_ref())
    }
}

impl TtsConfig {
    /// The configured credential, if usable.
    pub fn credential(&self) -> Option<&str> {
        usable_key(self.api_key.as_ref())
    }
}

impl RelayConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::RelayError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::RelayError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/voxrelay/config.toml`.
    ///
    /// Override the directory with `VOXRELAY_CONFIG_DIR`.
    pub fn default_config_path() -> PathBuf {
        if let Some(dir) = std::env::var_os("VOXRELAY_CONFIG_DIR") {
            return PathBuf::from(dir).join("config.toml");
        }
        dirs::config_dir()
            .map(|d| d.join("voxrelay"))
            .unwrap_or_else(|| PathBuf::from("/tmp/voxrelay-config"))
            .join("config.toml")
    }

    /// Overlay provider credentials from the process environment.
    ///
    /// Variables that are unset or blank leave the file value alone. A
    /// missing credential is not an error here; the affected stage reports
    /// it when a turn runs.
    pub fn apply_env_credentials(&mut self) {
        self.apply_credentials_from(|name| std::env::var(name).ok());
    }

    /// Overlay credentials using `lookup` to resolve variable names.
    pub fn apply_credentials_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(key) = pick(STT_API_KEY_ENV) {
            self.stt.api_key = Some(key);
        }
        if let Some(key) = pick(LLM_API_KEY_ENV) {
            self.llm.api_key = Some(key);
        }
        if let Some(key) = pick(TTS_API_KEY_ENV) {
            self.tts.api_key = Some(key);
        }
    }

    /// Load from `path` when given (defaults otherwise), then apply env credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> crate::error::Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env_credentials();
        Ok(config)
    }
}
