//! Exhaustive linear-scan index.
//!
//! O(1) build, O(n) search, exact results. This is the default strategy for
//! new and freshly loaded libraries.

use super::WorkingSet;
use crate::error::{Error, Result};
use crate::models::Chunk;

#[derive(Debug, Clone, Default)]
pub struct LinearIndex {
    set: WorkingSet,
    built: bool,
}

impl LinearIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chunks(&mut self, chunks: &[Chunk]) {
        self.set.add_chunks(chunks);
    }

    /// Nothing to precompute; building just flips the searchable flag.
    pub fn build(&mut self) {
        self.built = true;
    }

    /// Discard the working set ahead of a full rebuild.
    pub fn reset(&mut self) {
        self.set = WorkingSet::default();
        self.built = false;
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<(Vec<Chunk>, Vec<f32>)> {
        if !self.built {
            return Err(Error::IndexNotBuilt);
        }
        self.set.check_query(query)?;

        let candidates: Vec<usize> = (0..self.set.len()).collect();
        Ok(self.set.top_k(query, &candidates, k))
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::test_util::chunk;

    fn built_index(chunks: &[Chunk]) -> LinearIndex {
        let mut idx = LinearIndex::new();
        idx.add_chunks(chunks);
        idx.build();
        idx
    }

    #[test]
    fn test_search_before_build_fails() {
        let mut idx = LinearIndex::new();
        idx.add_chunks(&[chunk("a", vec![1.0, 0.0])]);
        assert!(matches!(idx.search(&[1.0, 0.0], 1), Err(Error::IndexNotBuilt)));
    }

    #[test]
    fn test_exact_top_k() {
        let idx = built_index(&[
            chunk("a", vec![1.0, 0.0, 0.0]),
            chunk("b", vec![0.0, 1.0, 0.0]),
            chunk("c", vec![0.9, 0.1, 0.0]),
        ]);

        let (chunks, scores) = idx.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(chunks[0].text, "a");
        assert_eq!(chunks[1].text, "c");
        assert_eq!(scores[0], 1.0);
        assert!(scores[0] >= scores[1]);
    }

    #[test]
    fn test_k_larger_than_set_returns_everything() {
        let idx = built_index(&[
            chunk("a", vec![1.0, 0.0]),
            chunk("b", vec![0.0, 1.0]),
            chunk("c", vec![0.5, 0.5]),
        ]);

        let (chunks, scores) = idx.search(&[1.0, 0.0], 100).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(scores.len(), 3);
    }

    #[test]
    fn test_empty_built_index_returns_nothing() {
        let mut idx = LinearIndex::new();
        idx.build();
        let (chunks, scores) = idx.search(&[1.0, 0.0], 5).unwrap();
        assert!(chunks.is_empty());
        assert!(scores.is_empty());
    }

    #[test]
    fn test_scores_monotonically_non_increasing() {
        let idx = built_index(&[
            chunk("a", vec![0.2, 0.8]),
            chunk("b", vec![1.0, 0.0]),
            chunk("c", vec![0.7, 0.3]),
            chunk("d", vec![0.0, 1.0]),
        ]);

        let (_, scores) = idx.search(&[1.0, 0.0], 4).unwrap();
        for pair in scores.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }
}
