//! Shared helpers for integration tests.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use voxrelay::config::{LlmConfig, RelayConfig, SttConfig, TtsConfig};
use voxrelay::error::{ReplyError, SynthesisError, TranscribeError};
use voxrelay::history::Exchange;
use voxrelay::llm::Responder;
use voxrelay::storage::MediaStore;
use voxrelay::stt::Transcriber;
use voxrelay::tts::{FallbackClip, StrategyOutcome, SynthesisStrategy, Synthesizer};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Media store rooted in a fresh temp dir. Keep the `TempDir` alive.
pub(crate) fn temp_media() -> (MediaStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let media = MediaStore::new(
        dir.path().join("uploads"),
        dir.path().join("static"),
        "/static",
    );
    media.ensure_dirs().expect("create media dirs");
    (media, dir)
}

/// Fallback clip without a local engine (always the silent WAV).
pub(crate) fn silent_fallback(media: &MediaStore) -> Arc<FallbackClip> {
    Arc::new(FallbackClip::new(
        media.fallback_path(),
        media.public_url(&media.fallback_path()),
        None,
    ))
}

/// Transcriber that returns a fixed result.
pub(crate) struct ScriptedTranscriber {
    result: Result<String, TranscribeError>,
    pub(crate) calls: AtomicUsize,
}

impl ScriptedTranscriber {
    pub(crate) fn ok(text: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(text.to_owned()),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing(err: TranscribeError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(err),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String, TranscribeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Responder that returns a fixed result and records what it was asked.
pub(crate) struct ScriptedResponder {
    result: Result<String, ReplyError>,
    pub(crate) seen: Mutex<Vec<(Vec<Exchange>, String)>>,
}

impl ScriptedResponder {
    pub(crate) fn ok(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(reply.to_owned()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn failing(err: ReplyError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(err),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn reply(&self, history: &[Exchange], latest: &str) -> Result<String, ReplyError> {
        self.seen
            .lock()
            .unwrap()
            .push((history.to_vec(), latest.to_owned()));
        self.result.clone()
    }
}

/// `(text, voice_id)` pairs seen by a [`RecordingStrategy`].
pub(crate) type SpokenLog = Arc<Mutex<Vec<(String, String)>>>;

/// Synthesis strategy that records the text and voice it was given and
/// always fails, so the synthesizer ends at the fallback clip.
#[derive(Default)]
pub(crate) struct RecordingStrategy {
    pub(crate) spoken: SpokenLog,
}

#[async_trait]
impl SynthesisStrategy for RecordingStrategy {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn attempt(&self, text: &str, voice_id: &str) -> StrategyOutcome {
        self.spoken
            .lock()
            .unwrap()
            .push((text.to_owned(), voice_id.to_owned()));
        StrategyOutcome::Continue(SynthesisError::RemoteSynthesis("offline".into()))
    }
}

/// Synthesizer whose only strategy records requests, ending at the silent clip.
pub(crate) fn recording_synthesizer(media: &MediaStore) -> (Arc<Synthesizer>, SpokenLog) {
    let strategy = RecordingStrategy::default();
    let spoken = Arc::clone(&strategy.spoken);
    let synth = Synthesizer::new(vec![Box::new(strategy)], silent_fallback(media));
    (Arc::new(synth), spoken)
}

/// Texts from a [`SpokenLog`], in order.
pub(crate) fn spoken_texts(spoken: &SpokenLog) -> Vec<String> {
    spoken
        .lock()
        .unwrap()
        .iter()
        .map(|(text, _)| text.clone())
        .collect()
}

pub(crate) fn stt_config(uri: &str) -> SttConfig {
    SttConfig {
        api_url: uri.to_owned(),
        api_key: Some("stt-test-key".to_owned()),
        poll_interval_ms: 10,
        max_poll_attempts: 5,
        request_timeout_secs: 5,
    }
}

pub(crate) fn llm_config(uri: &str) -> LlmConfig {
    LlmConfig {
        api_url: uri.to_owned(),
        api_key: Some("llm-test-key".to_owned()),
        request_timeout_secs: 5,
        ..LlmConfig::default()
    }
}

/// Remote TTS pointed at `uri`; the local engine is a path that does not exist.
pub(crate) fn tts_config(uri: &str) -> TtsConfig {
    TtsConfig {
        api_url: uri.to_owned(),
        api_key: Some("tts-test-key".to_owned()),
        local_engine: "/nonexistent/voxrelay-espeak".to_owned(),
        request_timeout_secs: 5,
        ..TtsConfig::default()
    }
}

/// Full config with every provider pointed at one mock server.
pub(crate) fn relay_config(uri: &str) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.server.port = 0;
    config.stt = stt_config(uri);
    config.llm = llm_config(uri);
    config.tts = tts_config(uri);
    config
}

/// Upload, submit and an immediately completed job returning `text`.
pub(crate) async fn mount_transcription_success(server: &MockServer, text: &str) {
    mount_completed_job(server, json!(text)).await;
}

/// Upload, submit and an immediately completed job whose `text` field is
/// `text` as given (which may be `null`).
pub(crate) async fn mount_completed_job(server: &MockServer, text: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/v2/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"upload_url": format!("{}/uploaded/1", server.uri())})),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/transcript"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "job-1", "status": "queued"})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/transcript/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "job-1",
            "status": "completed",
            "text": text
        })))
        .mount(server)
        .await;
}

/// Chat completion answering `reply`.
pub(crate) async fn mount_reply(server: &MockServer, reply: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": reply},
                "finish_reason": "stop"
            }]
        })))
        .mount(server)
        .await;
}

/// Speech generation returning a download URL on the same server.
pub(crate) async fn mount_speech_success(server: &MockServer, audio: &'static [u8]) {
    Mock::given(method("POST"))
        .and(path("/v1/speech/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"audioFile": format!("{}/files/speech.mp3", server.uri())})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/files/.+\.mp3$"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(audio))
        .mount(server)
        .await;
}

/// `true` when `url` looks like `/static/<32 hex>.<ext>`.
pub(crate) fn is_generated_url(url: &str, ext: &str) -> bool {
    let Some(name) = url.strip_prefix("/static/") else {
        return false;
    };
    let Some(stem) = name.strip_suffix(&format!(".{ext}")) else {
        return false;
    };
    stem.len() == 32 && stem.chars().all(|c| c.is_ascii_hexdigit())
}
