//! On-disk media locations for the relay.
//!
//! Uploaded recordings go to `uploads_dir`; synthesized speech and the
//! shared fallback clip go to `audio_dir`, which the server exposes under
//! `public_prefix`.

use crate::config::StorageConfig;
use crate::error::{RelayError, Result};
use std::path::{Path, PathBuf};

/// File name of the shared fallback clip inside the audio directory.
pub const FALLBACK_FILE_NAME: &str = "fallback.wav";

/// Upload and generated-audio directories plus their public URL mapping.
#[derive(Debug, Clone)]
pub struct MediaStore {
    uploads_dir: PathBuf,
    audio_dir: PathBuf,
    public_prefix: String,
}

impl MediaStore {
    pub fn new(
        uploads_dir: impl Into<PathBuf>,
        audio_dir: impl Into<PathBuf>,
        public_prefix: impl Into<String>,
    ) -> Self {
        let prefix: String = public_prefix.into();
        Self {
            uploads_dir: uploads_dir.into(),
            audio_dir: audio_dir.into(),
            public_prefix: prefix.trim_end_matches('/').to_owned(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            config.uploads_dir.clone(),
            config.audio_dir.clone(),
            config.public_prefix.clone(),
        )
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    /// Create the upload and audio directories if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if either directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.uploads_dir, &self.audio_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                RelayError::Storage(format!("cannot create {}: {e}", dir.display()))
            })?;
        }
        Ok(())
    }

    /// Persist an uploaded recording as `<uuid>_<sanitized name>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save_upload(&self, original_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        let name = format!(
            "{}_{}",
            uuid::Uuid::new_v4(),
            sanitize_file_name(original_name)
        );
        let path = self.uploads_dir.join(name);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            RelayError::Storage(format!("cannot write upload {}: {e}", path.display()))
        })?;
        Ok(path)
    }

    /// A fresh, unused path `audio_dir/<uuid>.<ext>`.
    pub fn new_audio_path(&self, ext: &str) -> PathBuf {
        let ext = ext.trim_start_matches('.');
        self.audio_dir
            .join(format!("{}.{ext}", uuid::Uuid::new_v4().simple()))
    }

    /// Public URL for a file in the audio directory.
    pub fn public_url(&self, path: &Path) -> String {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}/{name}", self.public_prefix)
    }

    /// Location of the shared fallback clip.
    pub fn fallback_path(&self) -> PathBuf {
        self.audio_dir.join(FALLBACK_FILE_NAME)
    }
}

/// Reduce a client-supplied file name to a safe basename.
///
/// Keeps ASCII alphanumerics, `.`, `-` and `_`; anything else becomes `_`.
/// Path components are dropped. Empty results become `upload`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_owned()
    } else {
        cleaned.to_owned()
    }
}
