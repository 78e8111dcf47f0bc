//! Random-hyperplane LSH index tuned for cosine similarity.
//!
//! `build` samples `num_hashes` hyperplanes from a standard normal
//! distribution and assigns every embedding to one bucket per plane by
//! hashing its projection. `search` unions the query's buckets into a
//! candidate set and scores only those, so results are approximate and may
//! return fewer than k chunks.
//!
//! The hyperplane RNG is seeded once per process, so rebuilding an
//! unchanged index reproduces the same planes and answers queries
//! identically for the lifetime of the process.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use super::WorkingSet;
use crate::error::{Error, Result};
use crate::models::Chunk;

static PROCESS_SEED: OnceLock<u64> = OnceLock::new();

fn process_seed() -> u64 {
    *PROCESS_SEED.get_or_init(rand::random)
}

/// Bucket assignment for a projection value.
///
/// Python hashes the raw float; here the float's bit pattern goes through a
/// stable integer hash so equal projections always land in the same bucket.
fn bucket_for(projection: f32, num_buckets: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    projection.to_bits().hash(&mut hasher);
    hasher.finish() % num_buckets.max(1) as u64
}

#[derive(Debug, Clone)]
pub struct LshIndex {
    set: WorkingSet,
    num_hashes: usize,
    num_buckets: usize,
    planes: Vec<Vec<f32>>,
    tables: Vec<HashMap<u64, Vec<usize>>>,
    built: bool,
}

impl LshIndex {
    pub fn new(num_hashes: usize, num_buckets: usize) -> Self {
        Self {
            set: WorkingSet::default(),
            num_hashes,
            num_buckets,
            planes: Vec::new(),
            tables: Vec::new(),
            built: false,
        }
    }

    pub fn add_chunks(&mut self, chunks: &[Chunk]) {
        self.set.add_chunks(chunks);
        self.built = false;
    }

    /// Discard the working set and hash tables ahead of a full rebuild.
    /// The H/B configuration is kept.
    pub fn reset(&mut self) {
        self.set = WorkingSet::default();
        self.planes.clear();
        self.tables.clear();
        self.built = false;
    }

    pub fn build(&mut self) {
        if self.set.is_empty() {
            self.planes.clear();
            self.tables.clear();
            self.built = true;
            return;
        }

        let dim = self.set.dimension().unwrap_or(0);
        let mut rng = StdRng::seed_from_u64(process_seed());

        self.planes = (0..self.num_hashes)
            .map(|_| (0..dim).map(|_| rng.sample(StandardNormal)).collect())
            .collect();

        self.tables = vec![HashMap::new(); self.num_hashes];
        for (i, embedding) in self.set.embeddings.iter().enumerate() {
            for (j, plane) in self.planes.iter().enumerate() {
                let projection: f32 = embedding.iter().zip(plane).map(|(e, p)| e * p).sum();
                let bucket = bucket_for(projection, self.num_buckets);
                self.tables[j].entry(bucket).or_default().push(i);
            }
        }

        self.built = true;
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<(Vec<Chunk>, Vec<f32>)> {
        if !self.built {
            return Err(Error::IndexNotBuilt);
        }
        self.set.check_query(query)?;

        // BTreeSet keeps the union sorted, i.e. in insertion order.
        let mut candidates: BTreeSet<usize> = BTreeSet::new();
        for (j, plane) in self.planes.iter().enumerate() {
            let projection: f32 = query.iter().zip(plane).map(|(q, p)| q * p).sum();
            let bucket = bucket_for(projection, self.num_buckets);
            if let Some(members) = self.tables[j].get(&bucket) {
                candidates.extend(members.iter().copied());
            }
        }

        let candidates: Vec<usize> = candidates.into_iter().collect();
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

    #[test]
    fn test_search_before_build_fails() {
        let mut idx = LshIndex::new(4, 16);
        idx.add_chunks(&[chunk("a", vec![1.0, 0.0])]);
        assert!(matches!(idx.search(&[1.0, 0.0], 1), Err(Error::IndexNotBuilt)));
    }

    #[test]
    fn test_empty_built_index_returns_nothing() {
        let mut idx = LshIndex::new(4, 16);
        idx.build();
        let (chunks, _) = idx.search(&[1.0, 0.0], 5).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_identical_vector_lands_in_its_own_buckets() {
        let mut idx = LshIndex::new(8, 32);
        idx.add_chunks(&[
            chunk("target", vec![1.0, 0.0, 0.0, 0.0]),
            chunk("other", vec![0.0, 1.0, 0.0, 0.0]),
        ]);
        idx.build();

        // A query equal to a stored vector hashes identically on every
        // plane, so the stored vector is always a candidate.
        let (chunks, scores) = idx.search(&[1.0, 0.0, 0.0, 0.0], 2).unwrap();
        assert!(chunks.iter().any(|c| c.text == "target"));
        let target_pos = chunks.iter().position(|c| c.text == "target").unwrap();
        assert!((scores[target_pos] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rebuild_is_deterministic_within_process() {
        let chunks: Vec<Chunk> = (0..20)
            .map(|i| {
                let angle = (i as f32) * 0.3;
                chunk(&format!("c{}", i), vec![angle.cos(), angle.sin(), 0.5, -0.5])
            })
            .collect();

        let mut a = LshIndex::new(6, 24);
        a.add_chunks(&chunks);
        a.build();

        let mut b = LshIndex::new(6, 24);
        b.add_chunks(&chunks);
        b.build();

        let query = vec![0.7, 0.1, 0.3, -0.2];
        let (chunks_a, scores_a) = a.search(&query, 5).unwrap();
        let (chunks_b, scores_b) = b.search(&query, 5).unwrap();

        let ids_a: Vec<&str> = chunks_a.iter().map(|c| c.text.as_str()).collect();
        let ids_b: Vec<&str> = chunks_b.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(ids_a, ids_b);
        assert_eq!(scores_a, scores_b);
    }

    #[test]
    fn test_result_never_exceeds_k() {
        let chunks: Vec<Chunk> = (0..12)
            .map(|i| chunk(&format!("c{}", i), vec![i as f32, 1.0]))
            .collect();
        let mut idx = LshIndex::new(4, 8);
        idx.add_chunks(&chunks);
        idx.build();

        let (found, scores) = idx.search(&[3.0, 1.0], 3).unwrap();
        assert!(found.len() <= 3);
        assert_eq!(found.len(), scores.len());
    }
}
