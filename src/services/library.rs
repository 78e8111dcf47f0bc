//! Library operations: creation, updates, deletion, index management, stats.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::constants::{MAX_DESCRIPTION_LEN, MAX_NAME_LEN};
use crate::error::{Error, Result};
use crate::index::{index_type_info, IndexTypeInfo};
use crate::models::{
    CreateLibraryRequest, IndexInfo, IndexType, Library, LibraryStats, StoreStats,
    UpdateLibraryRequest,
};
use crate::store::{LibraryPatch, Store};

#[derive(Clone)]
pub struct LibraryService {
    store: Arc<Store>,
}

impl LibraryService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn create_library(&self, request: CreateLibraryRequest) -> Result<Library> {
        let name = validate_name(&request.name, "Library")?;
        validate_description(&request.description)?;

        let library = Library::new(name, request.description, request.metadata);
        let library = self.store.create_library(library).await?;
        info!("📚 Library created: {} ({})", library.name, library.id);
        Ok(library)
    }

    pub async fn get_library(&self, library_id: &str) -> Result<Library> {
        self.store.get_library(library_id).await
    }

    pub async fn list_libraries(&self) -> Vec<Library> {
        self.store.list_libraries().await
    }

    pub async fn update_library(
        &self,
        library_id: &str,
        request: UpdateLibraryRequest,
    ) -> Result<Library> {
        let mut patch = LibraryPatch::default();

        if let Some(name) = request.name {
            patch.name = Some(validate_name(&name, "Library")?);
        }
        if let Some(description) = request.description {
            validate_description(&description)?;
            patch.description = Some(description);
        }
        patch.metadata = request.metadata;

        if patch.name.is_none() && patch.description.is_none() && patch.metadata.is_none() {
            return Err(Error::validation("No valid updates provided"));
        }

        self.store.update_library(library_id, patch).await
    }

    pub async fn delete_library(&self, library_id: &str) -> Result<()> {
        self.store.delete_library(library_id).await?;
        info!("🗑️  Library deleted: {}", library_id);
        Ok(())
    }

    /// Build or rebuild a library's index from a string tag plus LSH
    /// parameters. The tag and parameters are validated before the store is
    /// touched.
    pub async fn build_index(
        &self,
        library_id: &str,
        index_type: &str,
        num_hashes: Option<usize>,
        num_buckets: Option<usize>,
    ) -> Result<IndexInfo> {
        let index_type: IndexType = index_type.parse()?;

        if index_type == IndexType::Lsh && (num_hashes == Some(0) || num_buckets == Some(0)) {
            return Err(Error::validation("LSH parameters must be positive integers"));
        }

        self.store
            .build_index(library_id, index_type, num_hashes, num_buckets)
            .await
    }

    pub async fn index_info(&self, library_id: &str) -> Result<IndexInfo> {
        self.store.index_info(library_id).await
    }

    /// Static catalogue of the available index strategies.
    pub fn index_types_info(&self) -> HashMap<&'static str, IndexTypeInfo> {
        [IndexType::Linear, IndexType::KdTree, IndexType::Lsh]
            .into_iter()
            .map(|t| (t.as_str(), index_type_info(t)))
            .collect()
    }

    pub async fn library_stats(&self, library_id: &str) -> Result<LibraryStats> {
        let library = self.store.get_library(library_id).await?;
        let index_info = self.store.index_info(library_id).await.ok();

        Ok(LibraryStats {
            library_id: library.id.clone(),
            name: library.name.clone(),
            description: library.description.clone(),
            total_documents: library.documents.len(),
            total_chunks: library.total_chunks(),
            created_at: library.created_at,
            updated_at: library.updated_at,
            index_info,
            metadata: library.metadata,
        })
    }

    pub async fn store_stats(&self) -> StoreStats {
        self.store.stats().await
    }
}

fn validate_name(name: &str, entity: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{} name cannot be empty", entity)));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "{} name must be at most {} characters",
            entity, MAX_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_description(description: &str) -> Result<()> {
    if description.is_empty() || description.len() > MAX_DESCRIPTION_LEN {
        return Err(Error::validation(format!(
            "Library description must be between 1 and {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }
    Ok(())
}
