//! Vector index strategies and the shared index contract.
//!
//! Three strategies sit behind one enum: exhaustive linear scan, KD-tree
//! space partitioning, and random-hyperplane LSH. All of them share the same
//! lifecycle: `add_chunks` grows the working set, `build` makes it
//! searchable, `search` answers cosine k-NN. Rebuilds go through the store,
//! which constructs a fresh index from a library's full chunk set.

mod kdtree;
mod linear;
mod lsh;

pub use kdtree::KdTreeIndex;
pub use linear::LinearIndex;
pub use lsh::LshIndex;

use serde::Serialize;

use crate::constants::{DEFAULT_LSH_NUM_BUCKETS, DEFAULT_LSH_NUM_HASHES};
use crate::error::{Error, Result};
use crate::models::{Chunk, IndexType};

/// Cosine similarity between two vectors.
///
/// Returns `0.0` when either vector has zero norm, so degenerate embeddings
/// never produce NaN scores.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Chunks plus their embeddings, in insertion order.
///
/// Every strategy owns one of these; the position of a chunk in the set is
/// its identity inside the index, and the insertion order is what makes
/// equal-score ties deterministic.
#[derive(Debug, Clone, Default)]
pub(crate) struct WorkingSet {
    pub chunks: Vec<Chunk>,
    pub embeddings: Vec<Vec<f32>>,
}

impl WorkingSet {
    pub fn add_chunks(&mut self, chunks: &[Chunk]) {
        for chunk in chunks {
            self.embeddings.push(chunk.embedding.clone());
            self.chunks.push(chunk.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.embeddings.first().map(Vec::len)
    }

    /// Validate a query vector against the stored dimension.
    pub fn check_query(&self, query: &[f32]) -> Result<()> {
        if let Some(dim) = self.dimension() {
            if query.len() != dim {
                return Err(Error::validation(format!(
                    "Query embedding dimension mismatch: expected {}, got {}",
                    dim,
                    query.len()
                )));
            }
        }
        Ok(())
    }

    /// Score the given candidates against `query` and keep the top k.
    ///
    /// `candidates` must be in ascending (insertion) order; the stable sort
    /// then breaks equal scores by insertion order, earliest first.
    pub fn top_k(&self, query: &[f32], candidates: &[usize], k: usize) -> (Vec<Chunk>, Vec<f32>) {
        let mut scored: Vec<(usize, f32)> = candidates
            .iter()
            .map(|&i| (i, cosine_similarity(query, &self.embeddings[i])))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        let chunks = scored.iter().map(|&(i, _)| self.chunks[i].clone()).collect();
        let scores = scored.iter().map(|&(_, s)| s).collect();
        (chunks, scores)
    }
}

/// A library's similarity index: one of the three strategies.
#[derive(Debug, Clone)]
pub enum VectorIndex {
    Linear(LinearIndex),
    KdTree(KdTreeIndex),
    Lsh(LshIndex),
}

impl VectorIndex {
    /// Factory mapping an [`IndexType`] and LSH parameters to a strategy.
    pub fn create(
        index_type: IndexType,
        num_hashes: Option<usize>,
        num_buckets: Option<usize>,
    ) -> Self {
        match index_type {
            IndexType::Linear => VectorIndex::Linear(LinearIndex::new()),
            IndexType::KdTree => VectorIndex::KdTree(KdTreeIndex::new()),
            IndexType::Lsh => VectorIndex::Lsh(LshIndex::new(
                num_hashes.unwrap_or(DEFAULT_LSH_NUM_HASHES),
                num_buckets.unwrap_or(DEFAULT_LSH_NUM_BUCKETS),
            )),
        }
    }

    pub fn index_type(&self) -> IndexType {
        match self {
            VectorIndex::Linear(_) => IndexType::Linear,
            VectorIndex::KdTree(_) => IndexType::KdTree,
            VectorIndex::Lsh(_) => IndexType::Lsh,
        }
    }

    /// Append chunks to the working set. They become searchable after the
    /// next `build`.
    pub fn add_chunks(&mut self, chunks: &[Chunk]) {
        match self {
            VectorIndex::Linear(idx) => idx.add_chunks(chunks),
            VectorIndex::KdTree(idx) => idx.add_chunks(chunks),
            VectorIndex::Lsh(idx) => idx.add_chunks(chunks),
        }
    }

    /// Make the current working set searchable. Idempotent; an empty working
    /// set yields the empty-built state.
    pub fn build(&mut self) {
        match self {
            VectorIndex::Linear(idx) => idx.build(),
            VectorIndex::KdTree(idx) => idx.build(),
            VectorIndex::Lsh(idx) => idx.build(),
        }
    }

    /// Discard the working set, keeping the strategy and its configuration.
    /// Used by the store's full-rebuild flow before re-adding a library's
    /// complete chunk set.
    pub fn reset(&mut self) {
        match self {
            VectorIndex::Linear(idx) => idx.reset(),
            VectorIndex::KdTree(idx) => idx.reset(),
            VectorIndex::Lsh(idx) => idx.reset(),
        }
    }

    /// Return up to `k` chunks by descending cosine similarity, with scores.
    pub fn search(&self, query: &[f32], k: usize) -> Result<(Vec<Chunk>, Vec<f32>)> {
        match self {
            VectorIndex::Linear(idx) => idx.search(query, k),
            VectorIndex::KdTree(idx) => idx.search(query, k),
            VectorIndex::Lsh(idx) => idx.search(query, k),
        }
    }

    pub fn is_built(&self) -> bool {
        match self {
            VectorIndex::Linear(idx) => idx.is_built(),
            VectorIndex::KdTree(idx) => idx.is_built(),
            VectorIndex::Lsh(idx) => idx.is_built(),
        }
    }

    /// Number of chunks in the working set.
    pub fn len(&self) -> usize {
        match self {
            VectorIndex::Linear(idx) => idx.len(),
            VectorIndex::KdTree(idx) => idx.len(),
            VectorIndex::Lsh(idx) => idx.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Human-facing description of an index strategy, served by the
/// index-types catalogue endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct IndexTypeInfo {
    pub name: &'static str,
    pub build_time: &'static str,
    pub search_time: &'static str,
    pub space: &'static str,
    pub accuracy: &'static str,
    pub description: &'static str,
}

pub fn index_type_info(index_type: IndexType) -> IndexTypeInfo {
    match index_type {
        IndexType::Linear => IndexTypeInfo {
            name: "Linear Search",
            build_time: "O(1)",
            search_time: "O(n)",
            space: "O(n)",
            accuracy: "100%",
            description: "Exhaustive scan over all vectors. Exact results, \
                          slow for large libraries.",
        },
        IndexType::KdTree => IndexTypeInfo {
            name: "KD-Tree",
            build_time: "O(n log n)",
            search_time: "O(log n)",
            space: "O(n)",
            accuracy: "approximate",
            description: "Binary space-partitioning tree with a fixed \
                          exploration threshold. Fast descent, may miss \
                          neighbours near partition boundaries.",
        },
        IndexType::Lsh => IndexTypeInfo {
            name: "Locality Sensitive Hashing",
            build_time: "O(n)",
            search_time: "O(1)",
            space: "O(n)",
            accuracy: "~90-95%",
            description: "Random-hyperplane hashing into buckets. Fast \
                          approximate search, may miss some results.",
        },
    }
}


#[cfg(test)]
mod tests {
    use super::test_util::chunk;
    use super::*;

    #[test]
    fn test_cosine_similarity_basics() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_norm_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 1.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_top_k_ties_break_by_insertion_order() {
        let mut set = WorkingSet::default();
        set.add_chunks(&[
            chunk("first", vec![1.0, 0.0]),
            chunk("second", vec![1.0, 0.0]),
            chunk("third", vec![0.0, 1.0]),
        ]);

        let candidates: Vec<usize> = (0..set.len()).collect();
        let (chunks, scores) = set.top_k(&[1.0, 0.0], &candidates, 2);
        assert_eq!(chunks[0].text, "first");
        assert_eq!(chunks[1].text, "second");
        assert_eq!(scores, vec![1.0, 1.0]);
    }

    #[test]
    fn test_factory_produces_requested_type() {
        assert_eq!(
            VectorIndex::create(IndexType::Linear, None, None).index_type(),
            IndexType::Linear
        );
        assert_eq!(
            VectorIndex::create(IndexType::KdTree, None, None).index_type(),
            IndexType::KdTree
        );
        assert_eq!(
            VectorIndex::create(IndexType::Lsh, Some(4), Some(16)).index_type(),
            IndexType::Lsh
        );
    }

    #[test]
    fn test_query_dimension_mismatch_rejected() {
        let mut idx = VectorIndex::create(IndexType::Linear, None, None);
        idx.add_chunks(&[chunk("a", vec![1.0, 0.0, 0.0])]);
        idx.build();
        assert!(idx.search(&[1.0, 0.0], 1).is_err());
    }
}
