//! Config file round trips and wiring from config into the pipeline.

use voxrelay::config::{LLM_API_KEY_ENV, RelayConfig, STT_API_KEY_ENV};
use voxrelay::history::HistoryStore;
use voxrelay::pipeline::TurnOrchestrator;
use voxrelay::storage::MediaStore;

#[test]
fn load_explicit_file_keeps_file_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[server]
port = 9100

[storage]
audio_dir = "audio-out"
public_prefix = "/media"

[llm]
model = "llama3-8b-8192"
max_tokens = 200
"#,
    )
    .unwrap();

    let config = RelayConfig::load(Some(&path)).unwrap();
    assert_eq!(config.server.port, 9100);
    assert_eq!(config.llm.model, "llama3-8b-8192");
    assert_eq!(config.llm.max_tokens, 200);
    assert_eq!(config.stt.max_poll_attempts, 150);

    let media = MediaStore::from_config(&config.storage);
    assert_eq!(
        media.public_url(&media.new_audio_path("mp3")).split('/').nth(1),
        Some("media")
    );
}

#[test]
fn load_missing_explicit_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(RelayConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
}

#[test]
fn saved_config_never_contains_env_keys_unless_set() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.toml");

    let mut config = RelayConfig::default();
    config.apply_credentials_from(|name| (name == STT_API_KEY_ENV).then(|| "k-stt".to_owned()));
    config.save_to_file(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("k-stt"));
    assert_eq!(text.matches("api_key").count(), 1);

    let loaded = RelayConfig::from_file(&path).unwrap();
    assert_eq!(loaded.stt.credential(), Some("k-stt"));
    assert!(loaded.llm.credential().is_none());
}

#[test]
fn orchestrator_builds_without_any_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = RelayConfig::default();
    config.apply_credentials_from(|name| (name == LLM_API_KEY_ENV).then(String::new));

    let media = MediaStore::new(dir.path().join("u"), dir.path().join("s"), "/static");
    let orch = TurnOrchestrator::from_config(&config, &media, HistoryStore::new()).unwrap();
    assert!(orch.history().is_empty());
}
