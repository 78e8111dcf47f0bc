//! Thread-safe in-memory store with per-library indexes and snapshot
//! persistence.
//!
//! The store is the concurrency and durability boundary. A sharded registry
//! maps library ids to cells; each cell owns the library's entity graph
//! behind a reader-writer lock and its index behind an exclusive lock. Lock
//! order is always registry → entity lock → index lock, so a write on one
//! library never blocks readers of another beyond the brief registry touch.
//!
//! Every mutation is a critical section of validate → mutate → index update
//! under the entity write lock. The snapshot is written after that section
//! through a dedicated snapshot mutex; snapshot failures are logged and
//! never surfaced to the caller.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::constants::{DEFAULT_LSH_NUM_BUCKETS, DEFAULT_LSH_NUM_HASHES};
use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::models::{Chunk, Document, IndexInfo, IndexType, Library, StoreStats};
use crate::snapshot;

/// Field updates for a library. `None` leaves the field untouched.
#[derive(Debug, Default, Clone)]
pub struct LibraryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<HashMap<String, Value>>,
}

/// Field updates for a document. Replacing `chunks` triggers a full rebuild
/// of the owning library's index; a rename alone does not.
#[derive(Debug, Default, Clone)]
pub struct DocumentPatch {
    pub name: Option<String>,
    pub metadata: Option<HashMap<String, Value>>,
    pub chunks: Option<Vec<Chunk>>,
}

/// Construction options for [`Store::open`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Snapshot file; `None` disables persistence.
    pub persistence_path: Option<PathBuf>,
    /// Index strategy for newly created and freshly loaded libraries.
    pub default_index_type: IndexType,
    pub lsh_num_hashes: usize,
    pub lsh_num_buckets: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            persistence_path: None,
            default_index_type: IndexType::Linear,
            lsh_num_hashes: DEFAULT_LSH_NUM_HASHES,
            lsh_num_buckets: DEFAULT_LSH_NUM_BUCKETS,
        }
    }
}

/// One library's entity graph plus its index, each behind its own lock.
struct LibraryCell {
    library: RwLock<Library>,
    index: Mutex<VectorIndex>,
}

/// Concurrency-safe store over the library → document → chunk tree.
pub struct Store {
    registry: DashMap<String, Arc<LibraryCell>>,
    options: StoreOptions,
    /// Serializes snapshot writes. Taken only when no entity lock is held.
    snapshot_lock: Mutex<()>,
}

impl Store {
    /// Open a store, loading the snapshot when one exists.
    ///
    /// Every loaded library gets a freshly built index of the default
    /// strategy over its full chunk set; indexes are never persisted.
    pub fn open(options: StoreOptions) -> Result<Self> {
        let registry = DashMap::new();

        if let Some(path) = &options.persistence_path {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        Error::Internal(format!(
                            "Failed to create data directory {}: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
            }

            let libraries = snapshot::read(path)?;
            if !libraries.is_empty() {
                info!("📦 Loaded {} libraries from {}", libraries.len(), path.display());
            }
            for (library_id, library) in libraries {
                let mut index = VectorIndex::create(
                    options.default_index_type,
                    Some(options.lsh_num_hashes),
                    Some(options.lsh_num_buckets),
                );
                let chunks: Vec<Chunk> = library.all_chunks().cloned().collect();
                index.add_chunks(&chunks);
                index.build();

                registry.insert(
                    library_id,
                    Arc::new(LibraryCell {
                        library: RwLock::new(library),
                        index: Mutex::new(index),
                    }),
                );
            }
        }

        Ok(Self {
            registry,
            options,
            snapshot_lock: Mutex::new(()),
        })
    }

    /// In-memory store without persistence, mainly for tests.
    pub fn in_memory() -> Self {
        Self::open(StoreOptions::default()).expect("in-memory store cannot fail to open")
    }

    fn cell(&self, library_id: &str) -> Result<Arc<LibraryCell>> {
        self.registry
            .get(library_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::not_found(format!("Library with ID {} not found", library_id)))
    }

    /// Snapshot of all cells; never hold registry shard guards across await.
    fn cells(&self) -> Vec<Arc<LibraryCell>> {
        self.registry.iter().map(|entry| entry.value().clone()).collect()
    }

    // === Library operations ===

    pub async fn create_library(&self, library: Library) -> Result<Library> {
        use dashmap::mapref::entry::Entry;

        let mut index = VectorIndex::create(
            self.options.default_index_type,
            Some(self.options.lsh_num_hashes),
            Some(self.options.lsh_num_buckets),
        );
        // No chunks yet: building puts the index into the empty-built state.
        index.build();

        match self.registry.entry(library.id.clone()) {
            Entry::Occupied(_) => {
                return Err(Error::conflict(format!(
                    "Library with ID {} already exists",
                    library.id
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(LibraryCell {
                    library: RwLock::new(library.clone()),
                    index: Mutex::new(index),
                }));
            }
        }

        self.persist().await;
        Ok(library)
    }

    pub async fn get_library(&self, library_id: &str) -> Result<Library> {
        let cell = self.cell(library_id)?;
        let library = cell.library.read().await;
        Ok(library.clone())
    }

    pub async fn list_libraries(&self) -> Vec<Library> {
        let mut libraries = Vec::new();
        for cell in self.cells() {
            libraries.push(cell.library.read().await.clone());
        }
        libraries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        libraries
    }

    pub async fn update_library(&self, library_id: &str, patch: LibraryPatch) -> Result<Library> {
        let cell = self.cell(library_id)?;
        let updated = {
            let mut library = cell.library.write().await;
            if let Some(name) = patch.name {
                library.name = name;
            }
            if let Some(description) = patch.description {
                library.description = description;
            }
            if let Some(metadata) = patch.metadata {
                library.metadata = metadata;
            }
            library.updated_at = Utc::now();
            library.clone()
        };

        self.persist().await;
        Ok(updated)
    }

    pub async fn delete_library(&self, library_id: &str) -> Result<()> {
        // Dropping the cell also drops the library's index.
        self.registry
            .remove(library_id)
            .ok_or_else(|| Error::not_found(format!("Library with ID {} not found", library_id)))?;

        self.persist().await;
        Ok(())
    }

    // === Document operations ===

    pub async fn create_document(
        &self,
        library_id: &str,
        document: Document,
    ) -> Result<Document> {
        let cell = self.cell(library_id)?;
        {
            let mut library = cell.library.write().await;
            check_dimensions(&library, &document.chunks)?;

            library.documents.push(document.clone());
            library.updated_at = Utc::now();

            if !document.chunks.is_empty() {
                let mut index = cell.index.lock().await;
                index.add_chunks(&document.chunks);
                index.build();
            }
        }

        self.persist().await;
        Ok(document)
    }

    pub async fn get_document(&self, library_id: &str, document_id: &str) -> Result<Document> {
        let cell = self.cell(library_id)?;
        let library = cell.library.read().await;
        library
            .document(document_id)
            .cloned()
            .ok_or_else(|| document_not_found(library_id, document_id))
    }

    pub async fn list_documents(&self, library_id: &str) -> Result<Vec<Document>> {
        let cell = self.cell(library_id)?;
        let library = cell.library.read().await;
        Ok(library.documents.clone())
    }

    pub async fn update_document(
        &self,
        library_id: &str,
        document_id: &str,
        patch: DocumentPatch,
    ) -> Result<Document> {
        let cell = self.cell(library_id)?;
        let updated = {
            let mut library = cell.library.write().await;

            if let Some(new_chunks) = &patch.chunks {
                let others: Vec<&Chunk> = library
                    .documents
                    .iter()
                    .filter(|d| d.id != document_id)
                    .flat_map(|d| d.chunks.iter())
                    .collect();
                check_dimensions_against(others.first().map(|c| c.embedding.len()), new_chunks)?;
            }

            let chunks_replaced = patch.chunks.is_some();
            let now = Utc::now();
            let document = library
                .document_mut(document_id)
                .ok_or_else(|| document_not_found(library_id, document_id))?;

            if let Some(name) = patch.name {
                document.name = name;
            }
            if let Some(metadata) = patch.metadata {
                document.metadata = metadata;
            }
            if let Some(chunks) = patch.chunks {
                document.chunks = chunks;
            }
            document.updated_at = now;
            let updated = document.clone();
            library.updated_at = now;

            // Replacing chunks invalidates the index; a rename does not.
            if chunks_replaced {
                self.rebuild_index_from(&library, &cell).await;
            }

            updated
        };

        self.persist().await;
        Ok(updated)
    }

    pub async fn delete_document(&self, library_id: &str, document_id: &str) -> Result<()> {
        let cell = self.cell(library_id)?;
        {
            let mut library = cell.library.write().await;
            let before = library.documents.len();
            library.documents.retain(|d| d.id != document_id);
            if library.documents.len() == before {
                return Err(document_not_found(library_id, document_id));
            }
            library.updated_at = Utc::now();

            // Single-chunk removal is unsupported; dropping a document always
            // rebuilds from the library's remaining chunk set.
            self.rebuild_index_from(&library, &cell).await;
        }

        self.persist().await;
        Ok(())
    }

    /// Append chunks to a document. The whole batch is atomic: a concurrent
    /// search sees either none of the new chunks or all of them.
    pub async fn append_chunks(
        &self,
        library_id: &str,
        document_id: &str,
        chunks: Vec<Chunk>,
    ) -> Result<usize> {
        let cell = self.cell(library_id)?;
        {
            let mut library = cell.library.write().await;
            check_dimensions(&library, &chunks)?;

            let now = Utc::now();
            let document = library
                .document_mut(document_id)
                .ok_or_else(|| document_not_found(library_id, document_id))?;
            document.chunks.extend(chunks.iter().cloned());
            document.updated_at = now;
            library.updated_at = now;

            let mut index = cell.index.lock().await;
            index.add_chunks(&chunks);
            index.build();
        }

        self.persist().await;
        Ok(chunks.len())
    }

    // === Index operations ===

    /// Build or rebuild a library's index with the given strategy.
    pub async fn build_index(
        &self,
        library_id: &str,
        index_type: IndexType,
        num_hashes: Option<usize>,
        num_buckets: Option<usize>,
    ) -> Result<IndexInfo> {
        let cell = self.cell(library_id)?;
        let info = {
            let mut library = cell.library.write().await;

            let mut new_index = VectorIndex::create(index_type, num_hashes, num_buckets);
            let chunks: Vec<Chunk> = library.all_chunks().cloned().collect();
            new_index.add_chunks(&chunks);
            new_index.build();

            let info = IndexInfo {
                index_type: new_index.index_type().to_string(),
                is_built: new_index.is_built(),
                num_chunks: new_index.len(),
            };

            {
                let mut index = cell.index.lock().await;
                *index = new_index;
            }

            let now = Utc::now();
            library.index_type = Some(index_type);
            library.index_built_at = Some(now);
            library.updated_at = now;
            info
        };

        self.persist().await;
        debug!("🔨 Built {} index for library {}", info.index_type, library_id);
        Ok(info)
    }

    pub async fn index_info(&self, library_id: &str) -> Result<IndexInfo> {
        let cell = self.cell(library_id)?;
        let _library = cell.library.read().await;
        let index = cell.index.lock().await;
        Ok(IndexInfo {
            index_type: index.index_type().to_string(),
            is_built: index.is_built(),
            num_chunks: index.len(),
        })
    }

    // === Search ===

    /// k-NN over a library's index. Returns chunks, scores, and the strategy
    /// that served the query.
    pub async fn search(
        &self,
        library_id: &str,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<(Vec<Chunk>, Vec<f32>, IndexType)> {
        let cell = self.cell(library_id)?;
        let _library = cell.library.read().await;
        let index = cell.index.lock().await;
        let (chunks, scores) = index.search(query_embedding, k)?;
        Ok((chunks, scores, index.index_type()))
    }

    // === Introspection ===

    pub async fn stats(&self) -> StoreStats {
        let cells = self.cells();
        let mut total_documents = 0;
        let mut total_chunks = 0;
        for cell in &cells {
            let library = cell.library.read().await;
            total_documents += library.documents.len();
            total_chunks += library.total_chunks();
        }
        StoreStats {
            total_libraries: cells.len(),
            total_documents,
            total_chunks,
            indexed_libraries: cells.len(),
            persistence_enabled: self.options.persistence_path.is_some(),
        }
    }

    // === Internals ===

    /// Full rebuild of a cell's index from the library's complete chunk set.
    /// Caller must hold the library's write lock.
    async fn rebuild_index_from(&self, library: &Library, cell: &LibraryCell) {
        let chunks: Vec<Chunk> = library.all_chunks().cloned().collect();
        let mut index = cell.index.lock().await;
        index.reset();
        index.add_chunks(&chunks);
        index.build();
    }

    /// Write a fresh snapshot of the whole store.
    ///
    /// Called after every mutation, with no entity locks held. Errors are
    /// logged and swallowed: a failed snapshot must not fail the operation
    /// that triggered it.
    async fn persist(&self) {
        let Some(path) = &self.options.persistence_path else {
            return;
        };

        let _guard = self.snapshot_lock.lock().await;
        let mut libraries = HashMap::new();
        for cell in self.cells() {
            let library = cell.library.read().await;
            libraries.insert(library.id.clone(), library.clone());
        }

        if let Err(e) = snapshot::write(path, &libraries) {
            error!("Failed to persist store: {}", e);
        }
    }
}

fn document_not_found(library_id: &str, document_id: &str) -> Error {
    Error::not_found(format!(
        "Document with ID {} not found in library {}",
        document_id, library_id
    ))
}

/// Reject chunks whose dimension differs from the library's existing
/// embeddings or from each other. The whole batch fails together.
fn check_dimensions(library: &Library, chunks: &[Chunk]) -> Result<()> {
    check_dimensions_against(library.embedding_dimension(), chunks)
}

fn check_dimensions_against(existing: Option<usize>, chunks: &[Chunk]) -> Result<()> {
    let mut expected = existing;
    for chunk in chunks {
        match expected {
            Some(dim) if chunk.embedding.len() != dim => {
                return Err(Error::validation(format!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    dim,
                    chunk.embedding.len()
                )));
            }
            Some(_) => {}
            None => expected = Some(chunk.embedding.len()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn library(name: &str) -> Library {
        Library::new(name.to_string(), "test".to_string(), HashMap::new())
    }

    fn document(name: &str) -> Document {
        Document::new(name.to_string(), HashMap::new())
    }

    fn chunk(text: &str, embedding: Vec<f32>) -> Chunk {
        Chunk::new(text.to_string(), embedding, HashMap::new())
    }

    #[tokio::test]
    async fn test_library_crud() {
        let store = Store::in_memory();
        let lib = store.create_library(library("lib")).await.unwrap();

        assert_eq!(store.get_library(&lib.id).await.unwrap().name, "lib");
        assert_eq!(store.list_libraries().await.len(), 1);

        let patch = LibraryPatch {
            name: Some("renamed".to_string()),
            ..Default::default()
        };
        let updated = store.update_library(&lib.id, patch).await.unwrap();
        assert_eq!(updated.name, "renamed");
        assert!(updated.updated_at >= updated.created_at);

        store.delete_library(&lib.id).await.unwrap();
        assert!(store.get_library(&lib.id).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_library_id_conflicts() {
        let store = Store::in_memory();
        let lib = store.create_library(library("lib")).await.unwrap();
        let result = store.create_library(lib.clone()).await;
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_new_library_has_empty_built_index() {
        let store = Store::in_memory();
        let lib = store.create_library(library("lib")).await.unwrap();

        let info = store.index_info(&lib.id).await.unwrap();
        assert!(info.is_built);
        assert_eq!(info.num_chunks, 0);

        let (chunks, scores, _) = store.search(&lib.id, &[1.0, 0.0], 5).await.unwrap();
        assert!(chunks.is_empty());
        assert!(scores.is_empty());
    }

    #[tokio::test]
    async fn test_append_chunks_makes_them_searchable() {
        let store = Store::in_memory();
        let lib = store.create_library(library("lib")).await.unwrap();
        let doc = store.create_document(&lib.id, document("doc")).await.unwrap();

        store
            .append_chunks(
                &lib.id,
                &doc.id,
                vec![chunk("a", vec![1.0, 0.0, 0.0]), chunk("b", vec![0.0, 1.0, 0.0])],
            )
            .await
            .unwrap();

        let (chunks, scores, index_type) =
            store.search(&lib.id, &[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "a");
        assert_eq!(scores[0], 1.0);
        assert_eq!(scores[1], 0.0);
        assert_eq!(index_type, IndexType::Linear);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected_and_state_unchanged() {
        let store = Store::in_memory();
        let lib = store.create_library(library("lib")).await.unwrap();
        let doc = store.create_document(&lib.id, document("doc")).await.unwrap();
        store
            .append_chunks(&lib.id, &doc.id, vec![chunk("a", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();

        let result = store
            .append_chunks(
                &lib.id,
                &doc.id,
                vec![chunk("b", vec![0.0, 1.0, 0.0]), chunk("c", vec![1.0, 0.0])],
            )
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));

        let reloaded = store.get_document(&lib.id, &doc.id).await.unwrap();
        assert_eq!(reloaded.chunks.len(), 1);
        assert_eq!(store.index_info(&lib.id).await.unwrap().num_chunks, 1);
    }

    #[tokio::test]
    async fn test_delete_document_rebuilds_index() {
        let store = Store::in_memory();
        let lib = store.create_library(library("lib")).await.unwrap();
        let keep = store.create_document(&lib.id, document("keep")).await.unwrap();
        let doomed = store.create_document(&lib.id, document("doomed")).await.unwrap();
        store
            .append_chunks(&lib.id, &keep.id, vec![chunk("kept", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .append_chunks(&lib.id, &doomed.id, vec![chunk("dropped", vec![0.0, 1.0])])
            .await
            .unwrap();

        store.delete_document(&lib.id, &doomed.id).await.unwrap();

        let (chunks, _, _) = store.search(&lib.id, &[0.0, 1.0], 10).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "kept");
        assert_eq!(store.index_info(&lib.id).await.unwrap().num_chunks, 1);
    }

    #[tokio::test]
    async fn test_chunk_replacement_rebuilds_rename_does_not() {
        let store = Store::in_memory();
        let lib = store.create_library(library("lib")).await.unwrap();
        let doc = store.create_document(&lib.id, document("doc")).await.unwrap();
        store
            .append_chunks(&lib.id, &doc.id, vec![chunk("old", vec![1.0, 0.0])])
            .await
            .unwrap();

        // Rename alone leaves the index untouched.
        store
            .update_document(
                &lib.id,
                &doc.id,
                DocumentPatch {
                    name: Some("renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(store.index_info(&lib.id).await.unwrap().num_chunks, 1);

        // Replacing chunks rebuilds from the new set.
        store
            .update_document(
                &lib.id,
                &doc.id,
                DocumentPatch {
                    chunks: Some(vec![
                        chunk("new-a", vec![1.0, 0.0]),
                        chunk("new-b", vec![0.0, 1.0]),
                    ]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let (chunks, _, _) = store.search(&lib.id, &[1.0, 0.0], 10).await.unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert!(texts.contains(&"new-a"));
        assert!(texts.contains(&"new-b"));
        assert!(!texts.contains(&"old"));
    }

    #[tokio::test]
    async fn test_build_index_switches_strategy_and_stamps_library() {
        let store = Store::in_memory();
        let lib = store.create_library(library("lib")).await.unwrap();
        let doc = store.create_document(&lib.id, document("doc")).await.unwrap();
        store
            .append_chunks(
                &lib.id,
                &doc.id,
                vec![chunk("a", vec![1.0, 0.0]), chunk("b", vec![0.0, 1.0])],
            )
            .await
            .unwrap();

        let info = store
            .build_index(&lib.id, IndexType::KdTree, None, None)
            .await
            .unwrap();
        assert_eq!(info.index_type, "kdtree");
        assert!(info.is_built);
        assert_eq!(info.num_chunks, 2);

        let reloaded = store.get_library(&lib.id).await.unwrap();
        assert_eq!(reloaded.index_type, Some(IndexType::KdTree));
        assert!(reloaded.index_built_at.is_some());

        let (_, _, index_type) = store.search(&lib.id, &[1.0, 0.0], 1).await.unwrap();
        assert_eq!(index_type, IndexType::KdTree);
    }

    #[tokio::test]
    async fn test_build_index_is_idempotent() {
        let store = Store::in_memory();
        let lib = store.create_library(library("lib")).await.unwrap();
        let doc = store.create_document(&lib.id, document("doc")).await.unwrap();
        let chunks: Vec<Chunk> = (0..10)
            .map(|i| {
                let angle = (i as f32) * 0.61;
                chunk(&format!("c{}", i), vec![angle.cos(), angle.sin(), 0.2])
            })
            .collect();
        store.append_chunks(&lib.id, &doc.id, chunks).await.unwrap();

        let query = vec![0.8, 0.1, 0.1];
        store
            .build_index(&lib.id, IndexType::Lsh, Some(6), Some(32))
            .await
            .unwrap();
        let (first, first_scores, _) = store.search(&lib.id, &query, 5).await.unwrap();

        store
            .build_index(&lib.id, IndexType::Lsh, Some(6), Some(32))
            .await
            .unwrap();
        let (second, second_scores, _) = store.search(&lib.id, &query, 5).await.unwrap();

        let first_ids: Vec<&str> = first.iter().map(|c| c.id.as_str()).collect();
        let second_ids: Vec<&str> = second.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(first_ids, second_ids);
        assert_eq!(first_scores, second_scores);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = Store::in_memory();
        let lib = store.create_library(library("lib")).await.unwrap();
        let doc = store.create_document(&lib.id, document("doc")).await.unwrap();
        store
            .append_chunks(&lib.id, &doc.id, vec![chunk("a", vec![1.0])])
            .await
            .unwrap();

        let stats = store.stats().await;
        assert_eq!(stats.total_libraries, 1);
        assert_eq!(stats.total_documents, 1);
        assert_eq!(stats.total_chunks, 1);
        assert!(!stats.persistence_enabled);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let (lib_id, top_before) = {
            let store = Store::open(StoreOptions {
                persistence_path: Some(path.clone()),
                ..Default::default()
            })
            .unwrap();
            let lib = store.create_library(library("persisted")).await.unwrap();
            let doc = store.create_document(&lib.id, document("doc")).await.unwrap();
            store
                .append_chunks(
                    &lib.id,
                    &doc.id,
                    vec![
                        chunk("a", vec![0.9, 0.1, 0.0, 0.0]),
                        chunk("b", vec![0.0, 0.0, 1.0, 0.0]),
                    ],
                )
                .await
                .unwrap();
            let (top, _, _) = store.search(&lib.id, &[1.0, 0.0, 0.0, 0.0], 1).await.unwrap();
            (lib.id.clone(), top[0].id.clone())
        };

        // Reopen from the same path: entities reload, index is rebuilt fresh.
        let store = Store::open(StoreOptions {
            persistence_path: Some(path),
            ..Default::default()
        })
        .unwrap();

        let reloaded = store.get_library(&lib_id).await.unwrap();
        assert_eq!(reloaded.name, "persisted");
        assert_eq!(reloaded.total_chunks(), 2);
        assert_eq!(
            reloaded.all_chunks().next().unwrap().embedding,
            vec![0.9, 0.1, 0.0, 0.0]
        );

        let (top_after, _, _) = store.search(&lib_id, &[1.0, 0.0, 0.0, 0.0], 1).await.unwrap();
        assert_eq!(top_after[0].id, top_before);
    }

    #[tokio::test]
    async fn test_concurrent_append_and_search_is_atomic() {
        let store = Arc::new(Store::in_memory());
        let lib = store.create_library(library("lib")).await.unwrap();
        let doc = store.create_document(&lib.id, document("doc")).await.unwrap();
        store
            .append_chunks(&lib.id, &doc.id, vec![chunk("seed", vec![1.0, 0.0])])
            .await
            .unwrap();

        let writer = {
            let store = store.clone();
            let (lib_id, doc_id) = (lib.id.clone(), doc.id.clone());
            tokio::spawn(async move {
                for i in 0..20 {
                    let batch = vec![
                        chunk(&format!("w{}-a", i), vec![0.5, 0.5]),
                        chunk(&format!("w{}-b", i), vec![0.5, 0.5]),
                    ];
                    store.append_chunks(&lib_id, &doc_id, batch).await.unwrap();
                }
            })
        };

        let reader = {
            let store = store.clone();
            let lib_id = lib.id.clone();
            tokio::spawn(async move {
                for _ in 0..20 {
                    let (chunks, _, _) = store.search(&lib_id, &[1.0, 0.0], 100).await.unwrap();
                    // Batches of two land atomically: the count past the
                    // seed chunk is always even.
                    assert_eq!((chunks.len() - 1) % 2, 0);
                }
            })
        };

        writer.await.unwrap();
        reader.await.unwrap();

        let (chunks, _, _) = store.search(&lib.id, &[1.0, 0.0], 100).await.unwrap();
        assert_eq!(chunks.len(), 41);
    }
}
