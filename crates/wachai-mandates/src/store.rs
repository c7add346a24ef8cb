//! Local mandate storage.
//!
//! # Layout
//!
//! ```text
//! ~/.wachai/mandates/
//!   {mandateId}.json   # pretty-printed MandateRecord
//! ```
//!
//! Writes go to a temp file and are renamed into place, so a reader never
//! observes a half-written record. `put` replaces any record with the same id.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::error::{MandateError, MandateResult};
use crate::mandate::MandateRecord;

/// Keyed record store.
#[async_trait]
pub trait MandateStore: Send + Sync {
    /// Insert or replace by `mandate_id`.
    async fn put(&self, record: &MandateRecord) -> MandateResult<()>;

    /// Fails with `StorageNotFound` when absent.
    async fn get(&self, mandate_id: &str) -> MandateResult<MandateRecord>;
}

/// One JSON file per mandate.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, mandate_id: &str) -> MandateResult<PathBuf> {
        check_mandate_id(mandate_id)?;
        Ok(self.dir.join(format!("{}.json", mandate_id)))
    }
}

#[async_trait]
impl MandateStore for FileStore {
    async fn put(&self, record: &MandateRecord) -> MandateResult<()> {
        let path = self.record_path(&record.mandate_id)?;
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| storage_error("failed to create mandates directory", e))?;

        let json = record.to_pretty_json()?;
        write_atomic(&path, json.as_bytes()).await?;
        debug!(mandate_id = %record.mandate_id, path = %path.display(), "mandate stored");
        Ok(())
    }

    async fn get(&self, mandate_id: &str) -> MandateResult<MandateRecord> {
        let path = self.record_path(mandate_id)?;
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MandateError::StorageNotFound {
                    mandate_id: mandate_id.to_string(),
                })
            }
            Err(e) => return Err(storage_error("failed to read mandate", e)),
        };
        serde_json::from_str(&raw).map_err(|e| MandateError::Storage {
            message: format!("corrupt mandate file {}: {}", path.display(), e),
        })
    }
}

/// In-memory store, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, MandateRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Poisoning is ignored: every mutation is a single insert.
    fn records(&self) -> MutexGuard<'_, HashMap<String, MandateRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MandateStore for MemoryStore {
    async fn put(&self, record: &MandateRecord) -> MandateResult<()> {
        check_mandate_id(&record.mandate_id)?;
        self.records().insert(record.mandate_id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, mandate_id: &str) -> MandateResult<MandateRecord> {
        self.records()
            .get(mandate_id)
            .cloned()
            .ok_or_else(|| MandateError::StorageNotFound {
                mandate_id: mandate_id.to_string(),
            })
    }
}

/// Ids become file names; reject anything that could leave the directory.
pub(crate) fn check_mandate_id(mandate_id: &str) -> MandateResult<()> {
    let ok = !mandate_id.is_empty()
        && mandate_id.len() <= 128
        && mandate_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(MandateError::invalid_input(format!(
            "invalid mandate id: {:?}",
            mandate_id
        )))
    }
}

pub(crate) async fn write_atomic(path: &Path, content: &[u8]) -> MandateResult<()> {
    let temp_path = path.with_extension("tmp");

    fs::write(&temp_path, content)
        .await
        .map_err(|e| storage_error("failed to write temp file", e))?;

    fs::rename(&temp_path, path)
        .await
        .map_err(|e| storage_error("failed to rename temp file", e))?;

    Ok(())
}

fn storage_error(context: &str, err: std::io::Error) -> MandateError {
    MandateError::Storage {
        message: format!("{}: {}", context, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn record(id: &str, intent: &str) -> MandateRecord {
        serde_json::from_value(json!({
            "mandateId": id,
            "version": "0.1.0",
            "client": "eip155:1:0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "server": "eip155:1:0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "createdAt": "2026-01-01T00:00:00.000Z",
            "deadline": "2026-01-01T00:10:00.000Z",
            "intent": intent,
            "core": { "kind": "demo", "payload": {} },
            "signatures": {}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path().join("mandates"));
        let rec = record("m-1", "first");

        store.put(&rec).await.unwrap();
        assert_eq!(store.get("m-1").await.unwrap(), rec);

        let on_disk = std::fs::read_to_string(temp.path().join("mandates/m-1.json")).unwrap();
        assert_eq!(on_disk, rec.to_pretty_json().unwrap());
        assert!(!temp.path().join("mandates/m-1.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_store_overwrites_by_id() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());

        store.put(&record("m-2", "offer")).await.unwrap();
        store.put(&record("m-2", "accepted")).await.unwrap();
        assert_eq!(store.get("m-2").await.unwrap().intent, "accepted");
    }

    #[tokio::test]
    async fn test_file_store_not_found() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        let err = store.get("missing").await.unwrap_err();
        assert!(matches!(err, MandateError::StorageNotFound { .. }));
    }

    #[tokio::test]
    async fn test_rejects_path_traversal_ids() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        assert!(matches!(
            store.get("../etc/passwd").await,
            Err(MandateError::InvalidInput { .. })
        ));
        assert!(store.put(&record("a/b", "x")).await.is_err());
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        store.put(&record("m-3", "x")).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("m-3").await.unwrap().intent, "x");
        assert!(store.get("m-4").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_store_survives_poisoned_lock() {
        let store = MemoryStore::new();
        store.put(&record("m-5", "x")).await.unwrap();

        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = store.records.lock().unwrap();
            panic!("writer died");
        }));
        assert!(store.records.is_poisoned());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("m-5").await.unwrap().intent, "x");
        store.put(&record("m-6", "y")).await.unwrap();
        assert_eq!(store.len(), 2);
    }
}
