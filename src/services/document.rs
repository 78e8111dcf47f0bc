//! Document operations: CRUD, bulk chunk additions, name and metadata
//! search.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::constants::MAX_NAME_LEN;
use crate::error::{Error, Result};
use crate::models::{
    Chunk, CreateChunkRequest, CreateDocumentRequest, Document, DocumentStats,
    UpdateDocumentRequest,
};
use crate::store::{DocumentPatch, Store};

#[derive(Clone)]
pub struct DocumentService {
    store: Arc<Store>,
}

impl DocumentService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn create_document(
        &self,
        library_id: &str,
        request: CreateDocumentRequest,
    ) -> Result<Document> {
        let name = validate_name(&request.name)?;
        self.check_duplicate_name(library_id, &name, None).await?;

        let document = Document::new(name, request.metadata);
        let document = self.store.create_document(library_id, document).await?;
        info!("📄 Document created: {} in library {}", document.id, library_id);
        Ok(document)
    }

    pub async fn get_document(&self, library_id: &str, document_id: &str) -> Result<Document> {
        self.store.get_document(library_id, document_id).await
    }

    pub async fn list_documents(&self, library_id: &str) -> Result<Vec<Document>> {
        self.store.list_documents(library_id).await
    }

    pub async fn update_document(
        &self,
        library_id: &str,
        document_id: &str,
        request: UpdateDocumentRequest,
    ) -> Result<Document> {
        let mut patch = DocumentPatch::default();

        if let Some(name) = request.name {
            let name = validate_name(&name)?;
            self.check_duplicate_name(library_id, &name, Some(document_id))
                .await?;
            patch.name = Some(name);
        }
        patch.metadata = request.metadata;
        if let Some(chunk_requests) = request.chunks {
            patch.chunks = Some(validate_chunks(chunk_requests)?);
        }

        if patch.name.is_none() && patch.metadata.is_none() && patch.chunks.is_none() {
            return Err(Error::validation("No valid updates provided"));
        }

        self.store
            .update_document(library_id, document_id, patch)
            .await
    }

    pub async fn delete_document(&self, library_id: &str, document_id: &str) -> Result<()> {
        self.store.delete_document(library_id, document_id).await?;
        info!("🗑️  Document deleted: {} from library {}", document_id, library_id);
        Ok(())
    }

    /// Validate and append a batch of chunks. Returns the number appended.
    pub async fn add_chunks(
        &self,
        library_id: &str,
        document_id: &str,
        requests: Vec<CreateChunkRequest>,
    ) -> Result<usize> {
        if requests.is_empty() {
            return Err(Error::validation("No chunks provided"));
        }
        let chunks = validate_chunks(requests)?;
        self.store
            .append_chunks(library_id, document_id, chunks)
            .await
    }

    pub async fn document_stats(
        &self,
        library_id: &str,
        document_id: &str,
    ) -> Result<DocumentStats> {
        let document = self.get_document(library_id, document_id).await?;
        Ok(DocumentStats {
            document_id: document.id.clone(),
            library_id: library_id.to_string(),
            name: document.name.clone(),
            total_chunks: document.chunks.len(),
            created_at: document.created_at,
            updated_at: document.updated_at,
            metadata: document.metadata,
        })
    }

    /// Case-insensitive substring match over document names.
    pub async fn search_by_name(
        &self,
        library_id: &str,
        name_query: &str,
    ) -> Result<Vec<Document>> {
        let needle = name_query.to_lowercase();
        let documents = self.list_documents(library_id).await?;
        Ok(documents
            .into_iter()
            .filter(|d| d.name.to_lowercase().contains(&needle))
            .collect())
    }

    /// Documents whose metadata carries every filter key with an equal value.
    pub async fn search_by_metadata(
        &self,
        library_id: &str,
        filters: &HashMap<String, Value>,
    ) -> Result<Vec<Document>> {
        let documents = self.list_documents(library_id).await?;
        Ok(documents
            .into_iter()
            .filter(|d| {
                filters
                    .iter()
                    .all(|(key, value)| d.metadata.get(key) == Some(value))
            })
            .collect())
    }

    /// Document names are unique within one library, case-sensitive after
    /// trimming.
    async fn check_duplicate_name(
        &self,
        library_id: &str,
        name: &str,
        exclude_document_id: Option<&str>,
    ) -> Result<()> {
        let documents = self.list_documents(library_id).await?;
        let duplicate = documents
            .iter()
            .any(|d| d.name == name && Some(d.id.as_str()) != exclude_document_id);
        if duplicate {
            return Err(Error::validation(format!(
                "Document with name '{}' already exists in this library",
                name
            )));
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("Document name cannot be empty"));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "Document name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// Bulk chunk validation: non-empty text and a non-empty, finite embedding.
/// The batch fails as a whole on the first bad chunk.
fn validate_chunks(requests: Vec<CreateChunkRequest>) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::with_capacity(requests.len());
    for request in requests {
        if request.text.trim().is_empty() {
            return Err(Error::validation("Chunk text cannot be empty"));
        }
        if request.embedding.is_empty() {
            return Err(Error::validation("Chunk embedding cannot be empty"));
        }
        if request.embedding.iter().any(|v| !v.is_finite()) {
            return Err(Error::validation("Chunk embedding must contain finite numbers"));
        }
        chunks.push(Chunk::new(request.text, request.embedding, request.metadata));
    }
    Ok(chunks)
}
