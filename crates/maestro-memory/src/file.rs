//! JSON-file backed memory store.

use async_trait::async_trait;
use maestro_core::{ConversationEntry, RequestId};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::error::MemoryError;
use crate::in_memory::{InMemoryStore, MemorySnapshot};
use crate::store::{KnowledgeSnippet, MemoryStore, MemoryUsage};

/// A memory store that mirrors its state to a JSON file.
///
/// Reads are served from memory. Every write updates memory first, then
/// rewrites the file through a temporary file and an atomic rename. A failed
/// write returns [`MemoryError::Persistence`]; the in-memory state keeps the
/// update, so the next successful write persists it.
///
/// A corrupted file is copied aside (`<name>.corrupted.<timestamp>`) and the
/// store starts empty.
///
/// Multiple stores pointing at the same path will overwrite each other.
pub struct FileMemoryStore {
    path: PathBuf,
    inner: InMemoryStore,
    write_lock: Mutex<()>,
}

impl FileMemoryStore {
    /// Open the store at `path`, loading existing data if present.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, MemoryError> {
        let path = path.into();
        let snapshot = Self::load_snapshot(&path).await?;
        Ok(Self {
            inner: InMemoryStore::from_snapshot(snapshot),
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_snapshot(path: &Path) -> Result<MemorySnapshot, MemoryError> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = ?path, "Memory file not found, starting fresh");
                return Ok(MemorySnapshot::default());
            }
            Err(e) => {
                return Err(MemoryError::Load {
                    path: path.to_path_buf(),
                    details: e.to_string(),
                });
            }
        };

        match serde_json::from_str::<MemorySnapshot>(&contents) {
            Ok(snapshot) => {
                tracing::debug!(
                    path = ?path,
                    conversations = snapshot.conversations.len(),
                    knowledge = snapshot.knowledge.len(),
                    "Loaded memory file"
                );
                Ok(snapshot)
            }
            Err(e) => {
                tracing::error!(
                    path = ?path,
                    error = %e,
                    "Failed to parse memory file, starting fresh"
                );
                let backup = path.with_file_name(format!(
                    "{}.corrupted.{}",
                    path.file_name().unwrap_or_default().to_string_lossy(),
                    chrono::Utc::now().timestamp()
                ));
                if let Err(e) = tokio::fs::copy(path, &backup).await {
                    tracing::warn!(backup = ?backup, error = %e, "Failed to back up memory file");
                }
                Ok(MemorySnapshot::default())
            }
        }
    }

    async fn persist(&self) -> Result<(), MemoryError> {
        let _guard = self.write_lock.lock().await;

        let snapshot = self.inner.snapshot()?;
        let json = serde_json::to_string_pretty(&snapshot)?;
        let tmp_path = self.path.with_extension("tmp");

        tokio::fs::write(&tmp_path, json).await.map_err(|e| {
            tracing::error!(path = ?tmp_path, error = %e, "Failed to write memory file");
            MemoryError::Persistence {
                path: tmp_path.clone(),
                details: e.to_string(),
            }
        })?;

        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            tracing::error!(
                from = ?tmp_path,
                to = ?self.path,
                error = %e,
                "Failed to rename memory file"
            );
            MemoryError::Persistence {
                path: self.path.clone(),
                details: e.to_string(),
            }
        })?;

        tracing::debug!(path = ?self.path, "Persisted memory file");
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for FileMemoryStore {
    async fn append_interaction(
        &self,
        conversation_id: &RequestId,
        user_message: &str,
        assistant_message: &str,
    ) -> Result<(), MemoryError> {
        self.inner
            .append_interaction(conversation_id, user_message, assistant_message)
            .await?;
        self.persist().await
    }

    async fn get_history(
        &self,
        conversation_id: &RequestId,
    ) -> Result<Vec<ConversationEntry>, MemoryError> {
        self.inner.get_history(conversation_id).await
    }

    async fn search_relevant_with_threshold(
        &self,
        query: &str,
        limit: usize,
        threshold: f64,
    ) -> Result<Vec<KnowledgeSnippet>, MemoryError> {
        self.inner
            .search_relevant_with_threshold(query, limit, threshold)
            .await
    }

    async fn add_knowledge(&self, content: &str, source: &str) -> Result<(), MemoryError> {
        self.inner.add_knowledge(content, source).await?;
        self.persist().await
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.inner.clear().await?;
        self.persist().await
    }

    async fn usage(&self) -> MemoryUsage {
        self.inner.usage().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(s: &str) -> RequestId {
        RequestId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");

        {
            let store = FileMemoryStore::open(&path).await.unwrap();
            store.append_interaction(&id("r1"), "q", "a").await.unwrap();
            store
                .add_knowledge("database connection error", "runbook")
                .await
                .unwrap();
        }

        let reopened = FileMemoryStore::open(&path).await.unwrap();
        assert_eq!(reopened.get_history(&id("r1")).await.unwrap().len(), 2);
        let hits = reopened.search_relevant("database error", 10).await.unwrap();
        assert_eq!(hits[0].source, "runbook");
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileMemoryStore::open(dir.path().join("absent.json"))
            .await
            .unwrap();
        assert_eq!(store.usage().await, MemoryUsage::default());
    }

    #[tokio::test]
    async fn test_corrupted_file_is_backed_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileMemoryStore::open(&path).await.unwrap();
        assert_eq!(store.usage().await, MemoryUsage::default());

        let backups = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupted."))
            .count();
        assert_eq!(backups, 1);
    }

    #[tokio::test]
    async fn test_write_failure_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        // Parent directory does not exist, so the temp file cannot be written.
        let path = dir.path().join("missing").join("memory.json");
        let store = FileMemoryStore::open(&path).await.unwrap();

        let err = store
            .append_interaction(&id("r1"), "q", "a")
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "MEMORY_PERSISTENCE_ERROR");
        // Memory still holds the exchange.
        assert_eq!(store.get_history(&id("r1")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        let store = FileMemoryStore::open(&path).await.unwrap();
        store.add_knowledge("fact", "manual").await.unwrap();
        store.clear().await.unwrap();

        let reopened = FileMemoryStore::open(&path).await.unwrap();
        assert_eq!(reopened.usage().await.knowledge_entries, 0);
    }
}
