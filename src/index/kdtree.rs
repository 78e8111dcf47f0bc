//! KD-tree index: binary space partitioning over the embedding set.
//!
//! The splitting axis cycles with depth (`depth % dim`) and the splitting
//! element is the median along that axis; both internal and leaf nodes carry
//! a point, so a search may match anywhere in the tree. Search is
//! approximate: the off-side subtree is only explored when the query lies
//! within [`KDTREE_EXPLORATION_THRESHOLD`] of the split plane, so neighbours
//! just beyond a partition boundary can be missed.

use super::WorkingSet;
use crate::constants::KDTREE_EXPLORATION_THRESHOLD;
use crate::error::{Error, Result};
use crate::models::Chunk;

#[derive(Debug, Clone)]
struct Node {
    /// Index into the working set's embedding array.
    point: usize,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

#[derive(Debug, Clone, Default)]
pub struct KdTreeIndex {
    set: WorkingSet,
    root: Option<Box<Node>>,
    dimension: usize,
    built: bool,
}

impl KdTreeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chunks(&mut self, chunks: &[Chunk]) {
        self.set.add_chunks(chunks);
        // The tree no longer reflects the working set until the next build.
        self.built = false;
        self.root = None;
    }

    pub fn build(&mut self) {
        if self.set.is_empty() {
            self.root = None;
            self.built = true;
            return;
        }

        self.dimension = self.set.dimension().unwrap_or(0);
        let indices: Vec<usize> = (0..self.set.len()).collect();
        self.root = self.build_node(indices, 0);
        self.built = true;
    }

    /// Discard the working set and tree ahead of a full rebuild.
    pub fn reset(&mut self) {
        self.set = WorkingSet::default();
        self.root = None;
        self.built = false;
    }

    fn build_node(&self, mut indices: Vec<usize>, depth: usize) -> Option<Box<Node>> {
        if indices.is_empty() {
            return None;
        }

        let axis = depth % self.dimension;
        indices.sort_by(|&a, &b| {
            self.set.embeddings[a][axis]
                .partial_cmp(&self.set.embeddings[b][axis])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let median = indices.len() / 2;
        let point = indices[median];
        let left = self.build_node(indices[..median].to_vec(), depth + 1);
        let right = self.build_node(indices[median + 1..].to_vec(), depth + 1);

        Some(Box::new(Node { point, left, right }))
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<(Vec<Chunk>, Vec<f32>)> {
        if !self.built {
            return Err(Error::IndexNotBuilt);
        }
        self.set.check_query(query)?;

        let mut candidates = Vec::new();
        if let Some(root) = &self.root {
            self.collect_candidates(root, query, 0, &mut candidates);
        }
        // Traversal order depends on the tree shape; re-sorting into
        // insertion order keeps the equal-score tie-break deterministic.
        candidates.sort_unstable();

        Ok(self.set.top_k(query, &candidates, k))
    }

    fn collect_candidates(
        &self,
        node: &Node,
        query: &[f32],
        depth: usize,
        candidates: &mut Vec<usize>,
    ) {
        candidates.push(node.point);

        let axis = depth % self.dimension;
        let split = self.set.embeddings[node.point][axis];

        let (near, far) = if query[axis] < split {
            (&node.left, &node.right)
        } else {
            (&node.right, &node.left)
        };

        if let Some(child) = near {
            self.collect_candidates(child, query, depth + 1, candidates);
        }
        // Only cross the split plane when the query sits close to it.
        if let Some(child) = far {
            if (query[axis] - split).abs() < KDTREE_EXPLORATION_THRESHOLD {
                self.collect_candidates(child, query, depth + 1, candidates);
            }
        }
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

    fn built_index(chunks: &[Chunk]) -> KdTreeIndex {
        let mut idx = KdTreeIndex::new();
        idx.add_chunks(chunks);
        idx.build();
        idx
    }

    #[test]
    fn test_search_before_build_fails() {
        let mut idx = KdTreeIndex::new();
        idx.add_chunks(&[chunk("a", vec![1.0, 0.0])]);
        assert!(matches!(idx.search(&[1.0, 0.0], 1), Err(Error::IndexNotBuilt)));
    }

    #[test]
    fn test_exact_match_is_found() {
        let idx = built_index(&[
            chunk("a", vec![1.0, 0.0, 0.0]),
            chunk("b", vec![0.0, 1.0, 0.0]),
            chunk("c", vec![0.0, 0.0, 1.0]),
        ]);

        let (chunks, scores) = idx.search(&[1.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "a");
        assert!((scores[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_add_after_build_requires_rebuild() {
        let mut idx = built_index(&[chunk("a", vec![1.0, 0.0])]);
        idx.add_chunks(&[chunk("b", vec![0.0, 1.0])]);
        assert!(!idx.is_built());
        idx.build();
        let (chunks, _) = idx.search(&[0.0, 1.0], 2).unwrap();
        assert!(chunks.iter().any(|c| c.text == "b"));
    }

    #[test]
    fn test_empty_built_index_returns_nothing() {
        let mut idx = KdTreeIndex::new();
        idx.build();
        let (chunks, _) = idx.search(&[1.0], 3).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_results_at_most_k_and_sorted() {
        let points: Vec<Chunk> = (0..16)
            .map(|i| {
                let x = (i as f32) / 16.0;
                chunk(&format!("p{}", i), vec![x, 1.0 - x])
            })
            .collect();
        let idx = built_index(&points);

        let (chunks, scores) = idx.search(&[0.5, 0.5], 4).unwrap();
        assert!(chunks.len() <= 4);
        for pair in scores.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }
}
