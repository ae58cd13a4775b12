//! Local filesystem storage implementation.
//!
//! All writes go through a temp file that is renamed over the target, so a
//! crash mid-write leaves either the old document or the new one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Fingerprint, HistoryRecord, HistoryStore};
use crate::storage::HistoryStorage;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    history_file: PathBuf,
    diagnostics_dir: PathBuf,
}

impl LocalStorage {
    /// Create a LocalStorage for the given history file and diagnostics directory.
    pub fn new(history_file: impl Into<PathBuf>, diagnostics_dir: impl Into<PathBuf>) -> Self {
        Self {
            history_file: history_file.into(),
            diagnostics_dir: diagnostics_dir.into(),
        }
    }

    pub fn history_file(&self) -> &Path {
        &self.history_file
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        Self::ensure_dir(path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        Self::write_bytes(path, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl HistoryStorage for LocalStorage {
    async fn load_history(&self) -> HistoryStore {
        let bytes = match Self::read_bytes(&self.history_file).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                log::info!(
                    "No history at {}, starting empty",
                    self.history_file.display()
                );
                return HistoryStore::new();
            }
            Err(e) => {
                log::warn!(
                    "History file {} unreadable ({}). Starting fresh.",
                    self.history_file.display(),
                    e
                );
                return HistoryStore::new();
            }
        };

        let raw = match serde_json::from_slice::<BTreeMap<Fingerprint, Value>>(&bytes) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!(
                    "History file {} is corrupted ({}). Starting fresh.",
                    self.history_file.display(),
                    e
                );
                return HistoryStore::new();
            }
        };

        let history: HistoryStore = raw
            .into_iter()
            .filter_map(|(fingerprint, value)| {
                match serde_json::from_value::<HistoryRecord>(value) {
                    Ok(record) => Some((fingerprint, record)),
                    Err(e) => {
                        log::warn!("Skipping history record {}: {}", fingerprint.short(), e);
                        None
                    }
                }
            })
            .collect();

        log::info!(
            "Loaded {} historical records ({} active)",
            history.len(),
            history.active_count()
        );
        history
    }

    async fn persist_history(&self, history: &HistoryStore) -> Result<()> {
        Self::write_json(&self.history_file, history)
            .await
            .map_err(|e| {
                AppError::persistence(format!("{}: {}", self.history_file.display(), e))
            })
    }

    async fn write_diagnostic(&self, bytes: &[u8]) -> Result<PathBuf> {
        let path = self
            .diagnostics_dir
            .join(format!("error_{}.html", Utc::now().timestamp()));
        Self::write_bytes(&path, bytes).await?;
        Ok(path)
    }
}
