use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::StoreError;
use crate::tokens::TokenRecord;

use super::RecordStore;

/// JSON-file backend. The snapshot is a pretty-printed array of records.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Replace the snapshot with an arbitrary JSON document, verbatim.
    pub async fn save_value(&self, snapshot: &Value) -> Result<(), StoreError> {
        let payload = serde_json::to_vec_pretty(snapshot)?;
        self.replace_file(payload).await
    }

    async fn replace_file(&self, payload: Vec<u8>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        // Write beside the target and rename so readers never see a
        // partially written snapshot.
        let temp_path = self
            .path
            .with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&temp_path, payload)
            .await
            .map_err(|e| self.io_error(e))?;

        if let Err(err) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(self.io_error(err));
        }
        Ok(())
    }
}

/// Decode a snapshot array entry by entry. Entries that are not records at
/// all (no string `token`, not an object) are skipped with a warning.
pub fn decode_records(items: Vec<Value>) -> Vec<TokenRecord> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(index, error = %err, "skipping undecodable snapshot entry");
                None
            }
        })
        .collect()
}

#[async_trait]
impl RecordStore for FileStore {
    async fn load_all(&self) -> Result<Vec<TokenRecord>, StoreError> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "snapshot missing, starting empty");
                return Ok(Vec::new());
            }
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "snapshot unreadable, treating as empty"
                );
                return Ok(Vec::new());
            }
        };

        match serde_json::from_slice::<Vec<Value>>(&content) {
            Ok(items) => Ok(decode_records(items)),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "snapshot is not a valid record array, treating as empty"
                );
                Ok(Vec::new())
            }
        }
    }

    async fn save_all(&self, records: &[TokenRecord]) -> Result<(), StoreError> {
        let payload = serde_json::to_vec_pretty(records)?;
        self.replace_file(payload).await?;

        tracing::debug!(
            path = %self.path.display(),
            records = records.len(),
            "snapshot written"
        );
        Ok(())
    }
}
