//! HTTP surface: multipart query, validation errors, health and static audio.

use crate::helpers::{
    ScriptedResponder, ScriptedTranscriber, recording_synthesizer, relay_config, temp_media,
};
use serde_json::Value;
use std::sync::atomic::Ordering;
use voxrelay::error::TranscribeError;
use voxrelay::history::HistoryStore;
use voxrelay::pipeline::TurnOrchestrator;
use voxrelay::pipeline::coordinator::{
    APOLOGY_TEXT, REQUEST_FAILED_MARKER, TRANSCRIPTION_FAILED_MARKER,
};
use voxrelay::server::RelayServer;
use voxrelay::storage::MediaStore;

async fn start(orch: TurnOrchestrator, media: MediaStore) -> RelayServer {
    let mut config = relay_config("http://127.0.0.1:9");
    config.server.port = 0;
    RelayServer::start(orch, media, &config).await.unwrap()
}

fn audio_form(voice_id: Option<&str>) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(b"RIFF....WAVE".to_vec())
        .file_name("clip.wav")
        .mime_str("audio/wav")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("file", part);
    match voice_id {
        Some(v) => form.text("voiceId", v.to_owned()),
        None => form,
    }
}

#[tokio::test]
async fn query_runs_a_turn_and_returns_result() {
    let (media, _dir) = temp_media();
    let (synth, spoken) = recording_synthesizer(&media);
    let orch = TurnOrchestrator::new(
        ScriptedTranscriber::ok("hello"),
        ScriptedResponder::ok("Hi there!"),
        synth,
        HistoryStore::new(),
    );
    let server = start(orch, media.clone()).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/llm/query", server.addr()))
        .multipart(audio_form(Some("en-US-natalie")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["transcript"], "hello");
    assert_eq!(body["reply"], "Hi there!");
    assert_eq!(body["audio_url"], "/static/fallback.wav");
    assert_eq!(
        body["history"],
        serde_json::json!([{"user": "hello", "bot": "Hi there!"}])
    );

    // Upload persisted as <uuid>_clip.wav.
    let uploads: Vec<_> = std::fs::read_dir(media.uploads_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].ends_with("_clip.wav"));

    assert_eq!(
        spoken.lock().unwrap().as_slice(),
        [("Hi there!".to_owned(), "en-US-natalie".to_owned())]
    );
}

#[tokio::test]
async fn absent_or_blank_voice_id_uses_default_voice() {
    let (media, _dir) = temp_media();
    let (synth, spoken) = recording_synthesizer(&media);
    let orch = TurnOrchestrator::new(
        ScriptedTranscriber::ok("hello"),
        ScriptedResponder::ok("Hi"),
        synth,
        HistoryStore::new(),
    );
    let server = start(orch, media).await;
    let client = reqwest::Client::new();

    for voice_id in [None, Some("   ")] {
        let resp = client
            .post(format!("http://{}/llm/query", server.addr()))
            .multipart(audio_form(voice_id))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let voices: Vec<String> = spoken
        .lock()
        .unwrap()
        .iter()
        .map(|(_, voice)| voice.clone())
        .collect();
    assert_eq!(voices, ["en-US-charles", "en-US-charles"]);
}

#[tokio::test]
async fn unsaved_upload_reports_request_failure() {
    let (media, _dir) = temp_media();
    let (synth, spoken) = recording_synthesizer(&media);
    let transcriber = ScriptedTranscriber::ok("hello");
    let orch = TurnOrchestrator::new(
        transcriber.clone(),
        ScriptedResponder::ok("Hi"),
        synth,
        HistoryStore::new(),
    );
    let server = start(orch, media.clone()).await;

    // A regular file where the uploads directory should be.
    std::fs::remove_dir_all(media.uploads_dir()).unwrap();
    std::fs::write(media.uploads_dir(), b"in the way").unwrap();

    let resp = reqwest::Client::new()
        .post(format!("http://{}/llm/query", server.addr()))
        .multipart(audio_form(None))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["transcript"], REQUEST_FAILED_MARKER);
    assert_eq!(body["reply"], APOLOGY_TEXT);
    assert_eq!(body["audio_url"], "/static/fallback.wav");
    assert_eq!(body["history"], serde_json::json!([]));
    assert_eq!(transcriber.calls.load(Ordering::SeqCst), 0);
    assert!(spoken.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_file_is_bad_request() {
    let (media, _dir) = temp_media();
    let (synth, _spoken) = recording_synthesizer(&media);
    let orch = TurnOrchestrator::new(
        ScriptedTranscriber::ok("hello"),
        ScriptedResponder::ok("Hi"),
        synth,
        HistoryStore::new(),
    );
    let server = start(orch, media).await;

    let form = reqwest::multipart::Form::new().text("voiceId", "en-US-charles");
    let resp = reqwest::Client::new()
        .post(format!("http://{}/llm/query", server.addr()))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["type"], "invalid_request_error");
    assert!(body["error"]["message"].as_str().unwrap().contains("file"));
}

#[tokio::test]
async fn non_multipart_body_is_bad_request() {
    let (media, _dir) = temp_media();
    let (synth, _spoken) = recording_synthesizer(&media);
    let orch = TurnOrchestrator::new(
        ScriptedTranscriber::ok("hello"),
        ScriptedResponder::ok("Hi"),
        synth,
        HistoryStore::new(),
    );
    let server = start(orch, media).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/llm/query", server.addr()))
        .json(&serde_json::json!({"file": "nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn stage_failure_is_still_200() {
    let (media, _dir) = temp_media();
    let (synth, _spoken) = recording_synthesizer(&media);
    let orch = TurnOrchestrator::new(
        ScriptedTranscriber::failing(TranscribeError::Timeout { attempts: 3 }),
        ScriptedResponder::ok("unused"),
        synth,
        HistoryStore::new(),
    );
    let server = start(orch, media).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/llm/query", server.addr()))
        .multipart(audio_form(None))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["transcript"], TRANSCRIPTION_FAILED_MARKER);
    assert_eq!(body["reply"], APOLOGY_TEXT);
    assert_eq!(body["history"], serde_json::json!([]));
}

#[tokio::test]
async fn health_reports_turn_count_and_audio_is_served() {
    let (media, _dir) = temp_media();
    let (synth, _spoken) = recording_synthesizer(&media);
    let orch = TurnOrchestrator::new(
        ScriptedTranscriber::ok("hello"),
        ScriptedResponder::ok("Hi"),
        synth,
        HistoryStore::new(),
    );
    let server = start(orch, media).await;
    let client = reqwest::Client::new();
    let base = format!("http://{}", server.addr());

    let health: Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health, serde_json::json!({"status": "ok", "turns": 0}));

    let body: Value = client
        .post(format!("{base}/llm/query"))
        .multipart(audio_form(None))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let health: Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["turns"], 1);

    let audio_url = body["audio_url"].as_str().unwrap();
    let audio = client
        .get(format!("{base}{audio_url}"))
        .send()
        .await
        .unwrap();
    assert_eq!(audio.status(), 200);
    let bytes = audio.bytes().await.unwrap();
    assert!(bytes.starts_with(b"RIFF"));
}

#[tokio::test]
async fn shutdown_stops_the_server() {
    let (media, _dir) = temp_media();
    let (synth, _spoken) = recording_synthesizer(&media);
    let orch = TurnOrchestrator::new(
        ScriptedTranscriber::ok("hello"),
        ScriptedResponder::ok("Hi"),
        synth,
        HistoryStore::new(),
    );
    let mut server = start(orch, media).await;
    assert_ne!(server.port(), 0);

    server.shutdown();
    tokio::time::timeout(std::time::Duration::from_secs(5), server.join())
        .await
        .unwrap();
}
