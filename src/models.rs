//! Entity model for the vector database.
//!
//! Three entities form a strict ownership tree: a [`Library`] owns
//! [`Document`]s, a document owns [`Chunk`]s. The chunk is the unit of
//! search: text plus a fixed-dimension embedding plus free-form metadata.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Error;

/// Index strategy for a library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    Linear,
    KdTree,
    Lsh,
}

impl IndexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::Linear => "linear",
            IndexType::KdTree => "kdtree",
            IndexType::Lsh => "lsh",
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(IndexType::Linear),
            "kdtree" => Ok(IndexType::KdTree),
            "lsh" => Ok(IndexType::Lsh),
            other => Err(Error::validation(format!(
                "Invalid index type '{}'. Must be one of: linear, kdtree, lsh",
                other
            ))),
        }
    }
}

/// The atomic unit of retrieval: text, embedding, metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chunk {
    pub fn new(text: String, embedding: Vec<f32>, metadata: HashMap<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            text,
            embedding,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A named container of chunks within a library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(name: String, metadata: HashMap<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            metadata,
            chunks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Top-level collection and the unit of indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub index_type: Option<IndexType>,
    #[serde(default)]
    pub index_built_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Library {
    pub fn new(name: String, description: String, metadata: HashMap<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            description,
            metadata,
            documents: Vec::new(),
            index_type: None,
            index_built_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn document(&self, document_id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == document_id)
    }

    pub fn document_mut(&mut self, document_id: &str) -> Option<&mut Document> {
        self.documents.iter_mut().find(|d| d.id == document_id)
    }

    /// All chunks in document order, then chunk insertion order.
    ///
    /// This is the canonical ordering the indexes are built over, which makes
    /// the insertion-order tie-break of search deterministic.
    pub fn all_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.documents.iter().flat_map(|d| d.chunks.iter())
    }

    pub fn total_chunks(&self) -> usize {
        self.documents.iter().map(|d| d.chunks.len()).sum()
    }

    /// Dimension of the library's embeddings, taken from the first chunk.
    pub fn embedding_dimension(&self) -> Option<usize> {
        self.all_chunks().next().map(|c| c.embedding.len())
    }
}

// === Request payloads ===

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLibraryRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLibraryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocumentRequest {
    pub name: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDocumentRequest {
    pub name: Option<String>,
    pub metadata: Option<HashMap<String, Value>>,
    /// Replacing a document's chunks triggers a full index rebuild.
    pub chunks: Option<Vec<CreateChunkRequest>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateChunkRequest {
    pub text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub query_embedding: Vec<f32>,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub filters: HashMap<String, Value>,
}

fn default_k() -> usize {
    5
}

// === Response payloads ===

/// Result of a single-library k-NN search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunks: Vec<Chunk>,
    pub scores: Vec<f32>,
    pub total_found: usize,
    pub search_time_ms: f64,
    pub index_type: String,
}

impl SearchResult {
    /// Placeholder returned when a library in a cross-library search fails.
    pub fn empty() -> Self {
        Self {
            chunks: Vec::new(),
            scores: Vec::new(),
            total_found: 0,
            search_time_ms: 0.0,
            index_type: "unknown".to_string(),
        }
    }
}

/// Observable state of a library's index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexInfo {
    pub index_type: String,
    pub is_built: bool,
    pub num_chunks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryStats {
    pub library_id: String,
    pub name: String,
    pub description: String,
    pub total_documents: usize,
    pub total_chunks: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub index_info: Option<IndexInfo>,
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentStats {
    pub document_id: String,
    pub library_id: String,
    pub name: String,
    pub total_chunks: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: HashMap<String, Value>,
}

/// Store-wide totals.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_libraries: usize,
    pub total_documents: usize,
    pub total_chunks: usize,
    pub indexed_libraries: usize,
    pub persistence_enabled: bool,
}

/// Analytics summary for a library's search behaviour.
#[derive(Debug, Clone, Serialize)]
pub struct SearchAnalytics {
    pub library_id: String,
    pub total_documents: usize,
    pub total_chunks: usize,
    pub average_chunk_length: f64,
    pub embedding_dimension: usize,
    pub index_info: Option<IndexInfo>,
    pub search_capabilities: SearchCapabilities,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchCapabilities {
    pub vector_search: bool,
    pub metadata_filtering: bool,
    pub cross_library_search: bool,
    pub search_suggestions: bool,
}

impl Default for SearchCapabilities {
    fn default() -> Self {
        Self {
            vector_search: true,
            metadata_filtering: true,
            cross_library_search: true,
            search_suggestions: true,
        }
    }
}
