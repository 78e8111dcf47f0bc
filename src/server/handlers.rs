//! Request handlers: thin request/response mapping over the service calls.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::Result;
use crate::models::{
    CreateChunkRequest, CreateDocumentRequest, CreateLibraryRequest, Document, DocumentStats,
    IndexInfo, Library, LibraryStats, SearchAnalytics, SearchQuery, SearchResult, StoreStats,
    UpdateDocumentRequest, UpdateLibraryRequest,
};
use crate::services::Services;

// === Root ===

pub async fn health(State(services): State<Services>) -> Json<Value> {
    let stats = services.libraries.store_stats().await;
    Json(json!({
        "status": "healthy",
        "stats": stats,
        "timestamp": Utc::now(),
    }))
}

pub async fn store_stats(State(services): State<Services>) -> Json<StoreStats> {
    Json(services.libraries.store_stats().await)
}

// === Libraries ===

pub async fn create_library(
    State(services): State<Services>,
    Json(request): Json<CreateLibraryRequest>,
) -> Result<(StatusCode, Json<Library>)> {
    let library = services.libraries.create_library(request).await?;
    Ok((StatusCode::CREATED, Json(library)))
}

pub async fn list_libraries(State(services): State<Services>) -> Json<Vec<Library>> {
    Json(services.libraries.list_libraries().await)
}

pub async fn get_library(
    State(services): State<Services>,
    Path(library_id): Path<String>,
) -> Result<Json<Library>> {
    Ok(Json(services.libraries.get_library(&library_id).await?))
}

pub async fn update_library(
    State(services): State<Services>,
    Path(library_id): Path<String>,
    Json(request): Json<UpdateLibraryRequest>,
) -> Result<Json<Library>> {
    Ok(Json(
        services.libraries.update_library(&library_id, request).await?,
    ))
}

pub async fn delete_library(
    State(services): State<Services>,
    Path(library_id): Path<String>,
) -> Result<StatusCode> {
    services.libraries.delete_library(&library_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct BuildIndexQuery {
    #[serde(default = "default_index_type")]
    index_type: String,
    num_hashes: Option<usize>,
    num_buckets: Option<usize>,
}

fn default_index_type() -> String {
    "linear".to_string()
}

pub async fn build_index(
    State(services): State<Services>,
    Path(library_id): Path<String>,
    Query(params): Query<BuildIndexQuery>,
) -> Result<Json<Value>> {
    let info = services
        .libraries
        .build_index(
            &library_id,
            &params.index_type,
            params.num_hashes,
            params.num_buckets,
        )
        .await?;
    Ok(Json(json!({
        "message": format!("Index built successfully for library {}", library_id),
        "library_id": library_id,
        "index_type": info.index_type,
        "num_chunks": info.num_chunks,
    })))
}

pub async fn get_index_info(
    State(services): State<Services>,
    Path(library_id): Path<String>,
) -> Result<Json<IndexInfo>> {
    Ok(Json(services.libraries.index_info(&library_id).await?))
}

pub async fn index_types_info(State(services): State<Services>) -> Json<Value> {
    Json(json!(services.libraries.index_types_info()))
}

pub async fn library_stats(
    State(services): State<Services>,
    Path(library_id): Path<String>,
) -> Result<Json<LibraryStats>> {
    Ok(Json(services.libraries.library_stats(&library_id).await?))
}

// === Documents ===

pub async fn create_document(
    State(services): State<Services>,
    Path(library_id): Path<String>,
    Json(request): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<Document>)> {
    let document = services.documents.create_document(&library_id, request).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn list_documents(
    State(services): State<Services>,
    Path(library_id): Path<String>,
) -> Result<Json<Vec<Document>>> {
    Ok(Json(services.documents.list_documents(&library_id).await?))
}

pub async fn get_document(
    State(services): State<Services>,
    Path((library_id, document_id)): Path<(String, String)>,
) -> Result<Json<Document>> {
    Ok(Json(
        services.documents.get_document(&library_id, &document_id).await?,
    ))
}

pub async fn update_document(
    State(services): State<Services>,
    Path((library_id, document_id)): Path<(String, String)>,
    Json(request): Json<UpdateDocumentRequest>,
) -> Result<Json<Document>> {
    Ok(Json(
        services
            .documents
            .update_document(&library_id, &document_id, request)
            .await?,
    ))
}

pub async fn delete_document(
    State(services): State<Services>,
    Path((library_id, document_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    services
        .documents
        .delete_document(&library_id, &document_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_chunks(
    State(services): State<Services>,
    Path((library_id, document_id)): Path<(String, String)>,
    Json(chunks): Json<Vec<CreateChunkRequest>>,
) -> Result<Json<Value>> {
    let added = services
        .documents
        .add_chunks(&library_id, &document_id, chunks)
        .await?;
    Ok(Json(json!({
        "message": format!("Added {} chunks to document {}", added, document_id),
        "chunks_added": added,
    })))
}

pub async fn document_stats(
    State(services): State<Services>,
    Path((library_id, document_id)): Path<(String, String)>,
) -> Result<Json<DocumentStats>> {
    Ok(Json(
        services
            .documents
            .document_stats(&library_id, &document_id)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct NameSearchQuery {
    name_query: String,
}

pub async fn search_documents_by_name(
    State(services): State<Services>,
    Path(library_id): Path<String>,
    Query(params): Query<NameSearchQuery>,
) -> Result<Json<Vec<Document>>> {
    Ok(Json(
        services
            .documents
            .search_by_name(&library_id, &params.name_query)
            .await?,
    ))
}

pub async fn search_documents_by_metadata(
    State(services): State<Services>,
    Path(library_id): Path<String>,
    Json(filters): Json<HashMap<String, Value>>,
) -> Result<Json<Vec<Document>>> {
    Ok(Json(
        services
            .documents
            .search_by_metadata(&library_id, &filters)
            .await?,
    ))
}

// === Search ===

pub async fn search_library(
    State(services): State<Services>,
    Path(library_id): Path<String>,
    Json(query): Json<SearchQuery>,
) -> Result<Json<SearchResult>> {
    Ok(Json(services.search.search_library(&library_id, &query).await?))
}

#[derive(Debug, Deserialize)]
pub struct CrossLibraryQuery {
    /// Comma-separated library ids; all libraries when absent.
    library_ids: Option<String>,
}

pub async fn search_across_libraries(
    State(services): State<Services>,
    Query(params): Query<CrossLibraryQuery>,
    Json(query): Json<SearchQuery>,
) -> Json<HashMap<String, SearchResult>> {
    let library_ids = params.library_ids.map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
    });
    Json(
        services
            .search
            .search_across_libraries(&query, library_ids)
            .await,
    )
}

#[derive(Debug, Deserialize)]
pub struct SuggestionsQuery {
    partial_query: String,
    #[serde(default = "default_suggestion_limit")]
    limit: usize,
}

fn default_suggestion_limit() -> usize {
    5
}

pub async fn search_suggestions(
    State(services): State<Services>,
    Path(library_id): Path<String>,
    Query(params): Query<SuggestionsQuery>,
) -> Result<Json<Vec<String>>> {
    Ok(Json(
        services
            .search
            .suggestions(&library_id, &params.partial_query, params.limit)
            .await?,
    ))
}

pub async fn search_analytics(
    State(services): State<Services>,
    Path(library_id): Path<String>,
) -> Result<Json<SearchAnalytics>> {
    Ok(Json(services.search.analytics(&library_id).await?))
}
