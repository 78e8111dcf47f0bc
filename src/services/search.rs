//! Search operations: k-NN with metadata filtering, cross-library fan-out,
//! suggestions, and analytics.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::constants::{MAX_SEARCH_K, MAX_SUGGESTION_LIMIT};
use crate::error::{Error, Result};
use crate::filter;
use crate::models::{SearchAnalytics, SearchCapabilities, SearchQuery, SearchResult};
use crate::store::Store;

#[derive(Clone)]
pub struct SearchService {
    store: Arc<Store>,
}

impl SearchService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Cosine k-NN against one library, then metadata post-filtering.
    ///
    /// Filters only drop entries from the ranked top-k, preserving order, so
    /// a filtered result may hold fewer than k chunks even when more matches
    /// exist below the cutoff.
    pub async fn search_library(
        &self,
        library_id: &str,
        query: &SearchQuery,
    ) -> Result<SearchResult> {
        // Existence first, so an unknown library surfaces as not-found
        // rather than a validation failure.
        self.store.get_library(library_id).await?;
        validate_query(query)?;

        let start = Instant::now();
        let (chunks, scores, index_type) = self
            .store
            .search(library_id, &query.query_embedding, query.k)
            .await?;
        let search_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        let (chunks, scores) = if query.filters.is_empty() {
            (chunks, scores)
        } else {
            chunks
                .into_iter()
                .zip(scores)
                .filter(|(chunk, _)| filter::matches(&chunk.metadata, &query.filters))
                .unzip()
        };

        debug!(
            "🔍 Search in {} returned {} results in {:.2}ms",
            library_id,
            chunks.len(),
            search_time_ms
        );

        Ok(SearchResult {
            total_found: chunks.len(),
            chunks,
            scores,
            search_time_ms,
            index_type: index_type.to_string(),
        })
    }

    /// Fan a query out across many libraries.
    ///
    /// With no explicit list every library is searched. A failure on one
    /// library is captured as an empty result so a bad library cannot poison
    /// the aggregate response.
    pub async fn search_across_libraries(
        &self,
        query: &SearchQuery,
        library_ids: Option<Vec<String>>,
    ) -> HashMap<String, SearchResult> {
        let library_ids = match library_ids {
            Some(ids) if !ids.is_empty() => ids,
            _ => {
                self.store
                    .list_libraries()
                    .await
                    .into_iter()
                    .map(|l| l.id)
                    .collect()
            }
        };

        let mut results = HashMap::with_capacity(library_ids.len());
        for library_id in library_ids {
            match self.search_library(&library_id, query).await {
                Ok(result) => {
                    results.insert(library_id, result);
                }
                Err(e) => {
                    warn!("Error searching library {}: {}", library_id, e);
                    results.insert(library_id, SearchResult::empty());
                }
            }
        }
        results
    }

    /// Distinct case-folded words from the library's chunk text that start
    /// with the query prefix and are strictly longer than it. At most
    /// `limit` suggestions; their order is unspecified.
    pub async fn suggestions(
        &self,
        library_id: &str,
        partial_query: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        let partial = partial_query.trim().to_lowercase();
        if partial.is_empty() {
            return Err(Error::validation("Partial query cannot be empty"));
        }
        if limit == 0 || limit > MAX_SUGGESTION_LIMIT {
            return Err(Error::validation(format!(
                "Limit must be between 1 and {}",
                MAX_SUGGESTION_LIMIT
            )));
        }

        let library = match self.store.get_library(library_id).await {
            Ok(library) => library,
            Err(Error::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut suggestions = BTreeSet::new();
        'outer: for chunk in library.all_chunks() {
            for word in chunk.text.to_lowercase().split_whitespace() {
                if word.starts_with(&partial) && word.len() > partial.len() {
                    suggestions.insert(word.to_string());
                    if suggestions.len() >= limit {
                        break 'outer;
                    }
                }
            }
        }

        Ok(suggestions.into_iter().collect())
    }

    /// Content and index analytics for one library.
    pub async fn analytics(&self, library_id: &str) -> Result<SearchAnalytics> {
        let library = self.store.get_library(library_id).await?;
        let index_info = self.store.index_info(library_id).await.ok();

        let total_chunks = library.total_chunks();
        let average_chunk_length = if total_chunks > 0 {
            let total_len: usize = library.all_chunks().map(|c| c.text.len()).sum();
            (total_len as f64 / total_chunks as f64 * 100.0).round() / 100.0
        } else {
            0.0
        };

        Ok(SearchAnalytics {
            library_id: library.id.clone(),
            total_documents: library.documents.len(),
            total_chunks,
            average_chunk_length,
            embedding_dimension: library.embedding_dimension().unwrap_or(0),
            index_info,
            search_capabilities: SearchCapabilities::default(),
        })
    }
}

fn validate_query(query: &SearchQuery) -> Result<()> {
    if query.query_embedding.is_empty() {
        return Err(Error::validation("Query embedding cannot be empty"));
    }
    if query.query_embedding.iter().any(|v| !v.is_finite()) {
        return Err(Error::validation("Query embedding must contain finite numbers"));
    }
    if query.k == 0 || query.k > MAX_SEARCH_K {
        return Err(Error::validation(format!(
            "k must be between 1 and {}",
            MAX_SEARCH_K
        )));
    }
    Ok(())
}
