//! File-backed vector store using exact cosine similarity.
//!
//! [`FileVectorStore`] keeps every entry in memory behind a
//! `tokio::sync::RwLock` and writes the whole index as one JSON document to
//! `<dir>/index.json` on [`persist`](VectorStore::persist). It is meant for
//! local corpora of a few thousand chunks, where a linear scan is fast enough.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::{IndexedVector, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{IndexFingerprint, VectorStore};

/// File name of the serialized index inside the storage directory.
pub const INDEX_FILE_NAME: &str = "index.json";

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexState {
    version: u32,
    dimensions: Option<usize>,
    #[serde(default)]
    fingerprint: Option<IndexFingerprint>,
    /// source id → content hash
    sources: BTreeMap<String, String>,
    /// Insertion order is significant: it breaks ties between equal scores.
    entries: Vec<IndexedVector>,
    #[serde(skip)]
    positions: HashMap<(String, usize), usize>,
}

impl IndexState {
    fn new() -> Self {
        Self { version: FORMAT_VERSION, ..Self::default() }
    }

    fn reindex(&mut self) {
        self.positions = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| ((e.chunk.source.clone(), e.chunk.offset), i))
            .collect();
    }

    fn check_dimensions(&self, actual: usize) -> Result<()> {
        match self.dimensions {
            Some(expected) if expected != actual => {
                Err(RagError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

/// A vector store held in memory and persisted as JSON to a directory.
///
/// Entries are kept in insertion order; an upsert of an existing
/// `(source, offset)` identity replaces the entry in place. The first stored
/// vector fixes the dimensionality of the index.
///
/// # Example
///
/// ```rust,ignore
/// use ground_rag::{FileVectorStore, VectorStore};
///
/// let store = FileVectorStore::open(".rag_index")?; // empty on first run
/// store.upsert(&entries).await?;
/// store.persist().await?;
/// ```
#[derive(Debug)]
pub struct FileVectorStore {
    location: Option<PathBuf>,
    state: RwLock<IndexState>,
}

impl FileVectorStore {
    /// Create an empty store that never touches the file system.
    pub fn in_memory() -> Self {
        Self { location: None, state: RwLock::new(IndexState::new()) }
    }

    /// Open (load) the store persisted under `dir`.
    ///
    /// A directory that does not exist yet, or one without an index file, is
    /// an empty index: this is the first run.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexUnavailable`] if `dir` exists but is not a
    /// directory, or if the index file cannot be read or parsed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let state = Self::load_state(&dir)?;
        info!(path = %dir.display(), entries = state.entries.len(), "opened vector index");
        Ok(Self { location: Some(dir), state: RwLock::new(state) })
    }

    /// The storage directory, if the store is file-backed.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    fn load_state(dir: &Path) -> Result<IndexState> {
        let unavailable = |message: String| RagError::IndexUnavailable {
            path: dir.to_path_buf(),
            message,
        };

        if !dir.exists() {
            debug!(path = %dir.display(), "no index directory yet, starting empty");
            return Ok(IndexState::new());
        }
        if !dir.is_dir() {
            return Err(unavailable("path exists but is not a directory".to_string()));
        }

        let file = dir.join(INDEX_FILE_NAME);
        if !file.exists() {
            debug!(path = %file.display(), "no index file yet, starting empty");
            return Ok(IndexState::new());
        }

        let raw = std::fs::read_to_string(&file)
            .map_err(|e| unavailable(format!("failed to read {INDEX_FILE_NAME}: {e}")))?;
        let mut state: IndexState = serde_json::from_str(&raw)
            .map_err(|e| unavailable(format!("corrupt {INDEX_FILE_NAME}: {e}")))?;
        if state.version != FORMAT_VERSION {
            return Err(unavailable(format!(
                "unsupported index format version {} (expected {FORMAT_VERSION})",
                state.version
            )));
        }
        state.reindex();
        Ok(state)
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for FileVectorStore {
    async fn upsert(&self, entries: &[IndexedVector]) -> Result<()> {
        let mut state = self.state.write().await;
        let Some(first) = entries.first() else {
            return Ok(());
        };

        // Validate the whole batch before the first write.
        let expected = state.dimensions.unwrap_or(first.embedding.len());
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != expected) {
            return Err(RagError::DimensionMismatch { expected, actual: bad.embedding.len() });
        }
        state.dimensions = Some(expected);

        for entry in entries {
            let key = (entry.chunk.source.clone(), entry.chunk.offset);
            match state.positions.get(&key).copied() {
                Some(position) => state.entries[position] = entry.clone(),
                None => {
                    let position = state.entries.len();
                    state.entries.push(entry.clone());
                    state.positions.insert(key, position);
                }
            }
        }
        Ok(())
    }

    async fn delete_source(&self, source: &str) -> Result<usize> {
        let mut state = self.state.write().await;
        let before = state.entries.len();
        state.entries.retain(|e| e.chunk.source != source);
        state.sources.remove(source);
        let removed = before - state.entries.len();
        if removed > 0 {
            state.reindex();
        }
        if state.entries.is_empty() {
            state.dimensions = None;
        }
        Ok(removed)
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let state = self.state.read().await;
        if state.entries.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        state.check_dimensions(embedding.len())?;

        let mut scored: Vec<SearchResult> = state
            .entries
            .iter()
            .map(|entry| SearchResult {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&entry.embedding, embedding),
            })
            .collect();

        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    async fn dimensions(&self) -> Option<usize> {
        self.state.read().await.dimensions
    }

    async fn clear(&self) -> Result<()> {
        *self.state.write().await = IndexState::new();
        Ok(())
    }

    async fn source_hash(&self, source: &str) -> Option<String> {
        self.state.read().await.sources.get(source).cloned()
    }

    async fn record_source(&self, source: &str, content_hash: &str) -> Result<()> {
        self.state.write().await.sources.insert(source.to_string(), content_hash.to_string());
        Ok(())
    }

    async fn sources(&self) -> Vec<String> {
        self.state.read().await.sources.keys().cloned().collect()
    }

    async fn fingerprint(&self) -> Option<IndexFingerprint> {
        self.state.read().await.fingerprint.clone()
    }

    async fn set_fingerprint(&self, fingerprint: IndexFingerprint) -> Result<()> {
        self.state.write().await.fingerprint = Some(fingerprint);
        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        let Some(dir) = &self.location else {
            return Ok(());
        };
        let unavailable = |message: String| RagError::IndexUnavailable {
            path: dir.clone(),
            message,
        };

        let (json, entry_count) = {
            let state = self.state.read().await;
            let json = serde_json::to_vec(&*state)
                .map_err(|e| unavailable(format!("failed to serialize index: {e}")))?;
            (json, state.entries.len())
        };

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| unavailable(format!("failed to create directory: {e}")))?;

        // Write next to the target and rename, so readers never see a partial file.
        let target = dir.join(INDEX_FILE_NAME);
        let staging = dir.join(format!("{INDEX_FILE_NAME}.tmp"));
        tokio::fs::write(&staging, &json)
            .await
            .map_err(|e| unavailable(format!("failed to write index: {e}")))?;
        tokio::fs::rename(&staging, &target)
            .await
            .map_err(|e| unavailable(format!("failed to replace index: {e}")))?;

        info!(path = %target.display(), entries = entry_count, "persisted vector index");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chunk;

    fn entry(source: &str, offset: usize, text: &str, embedding: Vec<f32>) -> IndexedVector {
        IndexedVector { chunk: Chunk::new(source, offset, text), embedding }
    }

    #[tokio::test]
    async fn search_on_empty_store_is_empty() {
        let store = FileVectorStore::in_memory();
        let results = store.search(&[1.0, 0.0], 3).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn upsert_is_idempotent_per_source_and_offset() {
        let store = FileVectorStore::in_memory();
        store.upsert(&[entry("a.txt", 0, "old", vec![1.0, 0.0])]).await.unwrap();
        store.upsert(&[entry("a.txt", 0, "new", vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(store.len().await, 1);

        let results = store.search(&[0.0, 1.0], 5).await.unwrap();
        assert_eq!(results[0].chunk.text, "new");
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let store = FileVectorStore::in_memory();
        store.add(Chunk::new("b.txt", 0, "first"), vec![1.0, 0.0]).await.unwrap();
        store.add(Chunk::new("a.txt", 0, "second"), vec![2.0, 0.0]).await.unwrap();
        store.add(Chunk::new("c.txt", 0, "third"), vec![0.5, 0.0]).await.unwrap();

        let results = store.search(&[1.0, 0.0], 3).await.unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn rejects_mismatched_dimensions() {
        let store = FileVectorStore::in_memory();
        store.add(Chunk::new("a.txt", 0, "x"), vec![1.0, 0.0, 0.0]).await.unwrap();
        let err = store.add(Chunk::new("a.txt", 3, "y"), vec![1.0]).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 1 }));
        assert!(store.search(&[1.0, 0.0], 1).await.is_err());
    }

    #[tokio::test]
    async fn mixed_dimension_batch_writes_nothing() {
        let store = FileVectorStore::in_memory();
        store.add(Chunk::new("a.txt", 0, "x"), vec![1.0, 0.0]).await.unwrap();

        let batch = [
            entry("b.txt", 0, "fits", vec![0.0, 1.0]),
            entry("b.txt", 4, "too long", vec![0.0, 1.0, 0.0]),
        ];
        let err = store.upsert(&batch).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 3 }));
        assert_eq!(store.len().await, 1);

        // The same holds for the first batch into an empty store.
        let empty = FileVectorStore::in_memory();
        assert!(empty.upsert(&batch).await.is_err());
        assert!(empty.is_empty().await);
        assert_eq!(empty.dimensions().await, None);
    }

    #[tokio::test]
    async fn delete_source_removes_entries_and_hash() {
        let store = FileVectorStore::in_memory();
        store.add(Chunk::new("a.txt", 0, "x"), vec![1.0, 0.0]).await.unwrap();
        store.add(Chunk::new("a.txt", 4, "y"), vec![0.0, 1.0]).await.unwrap();
        store.add(Chunk::new("b.txt", 0, "z"), vec![1.0, 1.0]).await.unwrap();
        store.record_source("a.txt", "h1").await.unwrap();

        assert_eq!(store.delete_source("a.txt").await.unwrap(), 2);
        assert_eq!(store.len().await, 1);
        assert!(store.source_hash("a.txt").await.is_none());

        // Positions were rebuilt, so an upsert of the survivor still replaces it.
        store.add(Chunk::new("b.txt", 0, "z2"), vec![1.0, 1.0]).await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn open_missing_directory_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let store = FileVectorStore::open(temp.path().join("never-created")).unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn open_corrupt_index_fails() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join(INDEX_FILE_NAME), "{not json").unwrap();
        let err = FileVectorStore::open(temp.path()).unwrap_err();
        assert!(matches!(err, RagError::IndexUnavailable { .. }));
    }

    #[tokio::test]
    async fn open_file_instead_of_directory_fails() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("plain-file");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(FileVectorStore::open(&file), Err(RagError::IndexUnavailable { .. })));
    }

    #[tokio::test]
    async fn persist_creates_directory_and_leaves_no_staging_file() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("index");
        let store = FileVectorStore::open(&dir).unwrap();
        store.add(Chunk::new("a.txt", 0, "x"), vec![1.0, 0.0]).await.unwrap();
        store.record_source("a.txt", "h").await.unwrap();
        let fingerprint = IndexFingerprint {
            chunk_size: 500,
            chunk_overlap: 100,
            embedding_model: "Mock/2".into(),
        };
        store.set_fingerprint(fingerprint.clone()).await.unwrap();
        store.persist().await.unwrap();

        assert!(dir.join(INDEX_FILE_NAME).exists());
        assert!(!dir.join(format!("{INDEX_FILE_NAME}.tmp")).exists());

        let reloaded = FileVectorStore::open(&dir).unwrap();
        assert_eq!(reloaded.len().await, 1);
        assert_eq!(reloaded.source_hash("a.txt").await.as_deref(), Some("h"));
        assert_eq!(reloaded.sources().await, vec!["a.txt".to_string()]);
        assert_eq!(reloaded.fingerprint().await, Some(fingerprint));
        assert_eq!(reloaded.dimensions().await, Some(2));
    }
}
