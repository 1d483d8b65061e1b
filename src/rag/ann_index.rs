// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Growable HNSW index for approximate nearest neighbor search
//!
//! Labels are dense: the n-th inserted vector gets label `n`, which is also its
//! position in the document store. The underlying HNSW graph is sized for a fixed
//! number of elements, so when it fills up the index is rebuilt with twice the
//! capacity from the retained vectors and swapped in. Labels survive the rebuild.
//!
//! Graph search can miss nodes, so small indexes (and any search whose candidate
//! list would cover every element) are answered by an exact scan of the retained
//! vectors. A graph search that comes back short is replaced by the exact scan.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut index = AnnIndex::new(1024, 64);
//! let label = index.insert(&vector)?;
//! let neighbors = index.search(&query, 5)?;
//! ```

use hnsw_rs::hnsw::{Hnsw, Neighbour};
use hnsw_rs::prelude::*;
use tracing::debug;

use super::errors::RagError;

/// Connections per node (M parameter)
const MAX_NB_CONNECTION: usize = 16;
const EF_CONSTRUCTION: usize = 200;
/// Floor for ef during search
const MIN_EF_SEARCH: usize = 64;
/// hnsw_rs supports at most 16 layers
const MAX_LAYERS: usize = 16;

/// One search hit, closest first
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub label: usize,
    /// Cosine distance (0.0 = identical direction)
    pub distance: f32,
}

pub struct AnnIndex {
    hnsw: Hnsw<'static, f32, DistCosine>,
    /// Normalized vectors by label, kept for rebuilds
    vectors: Vec<Vec<f32>>,
    capacity: usize,
    dimensions: usize,
}

impl AnnIndex {
    /// Create an empty index
    ///
    /// # Arguments
    /// * `dimensions` - Length of every vector stored
    /// * `capacity` - Initial number of elements the graph is sized for
    pub fn new(dimensions: usize, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            hnsw: build_hnsw(capacity),
            vectors: Vec::with_capacity(capacity),
            capacity,
            dimensions,
        }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Check a vector would be accepted by [`insert`](Self::insert)
    pub fn validate(&self, vector: &[f32]) -> Result<(), RagError> {
        if vector.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(RagError::InvalidVector(
                "contains NaN or Infinity values".to_string(),
            ));
        }
        Ok(())
    }

    /// Insert a vector under the next free label and return that label
    pub fn insert(&mut self, vector: &[f32]) -> Result<usize, RagError> {
        self.validate(vector)?;

        if self.vectors.len() >= self.capacity {
            self.grow();
        }

        let label = self.vectors.len();
        let normalized = normalize_vector(vector);
        self.hnsw.insert((normalized.as_slice(), label));
        self.vectors.push(normalized);
        Ok(label)
    }

    /// k nearest labels to `query`, ascending distance
    ///
    /// Returns fewer than `k` hits when the index holds fewer vectors.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, RagError> {
        self.validate(query)?;

        let k = k.min(self.vectors.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let normalized = normalize_vector(query);
        let ef_search = (k * 2).max(MIN_EF_SEARCH);
        if self.vectors.len() <= ef_search {
            return Ok(self.exact_search(&normalized, k));
        }

        let neighbours: Vec<Neighbour> = self.hnsw.search(&normalized, k, ef_search);

        let mut results: Vec<Neighbor> = neighbours
            .into_iter()
            .map(|n| Neighbor {
                label: n.d_id,
                distance: n.distance,
            })
            .collect();
        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);

        if results.len() < k {
            debug!(
                "Graph search returned {} of {} neighbors, falling back to exact scan",
                results.len(),
                k
            );
            return Ok(self.exact_search(&normalized, k));
        }
        Ok(results)
    }

    /// Brute-force k nearest over every retained vector
    fn exact_search(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        let mut results: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(label, vector)| Neighbor {
                label,
                distance: cosine_distance(query, vector),
            })
            .collect();
        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.label.cmp(&b.label))
        });
        results.truncate(k);
        results
    }

    /// Rebuild the graph with doubled capacity and swap it in
    fn grow(&mut self) {
        let new_capacity = self.capacity * 2;
        let hnsw = build_hnsw(new_capacity);
        for (label, vector) in self.vectors.iter().enumerate() {
            hnsw.insert((vector.as_slice(), label));
        }

        debug!(
            "Rebuilt HNSW index: {} vectors, capacity {} -> {}",
            self.vectors.len(),
            self.capacity,
            new_capacity
        );
        self.hnsw = hnsw;
        self.capacity = new_capacity;
    }
}

fn build_hnsw(capacity: usize) -> Hnsw<'static, f32, DistCosine> {
    let nb_layer = ((capacity as f32).log2().ceil() as usize).clamp(4, MAX_LAYERS);
    Hnsw::new(MAX_NB_CONNECTION, capacity, nb_layer, EF_CONSTRUCTION, DistCosine)
}

/// 1 - cosine similarity; a zero vector is at distance 1 from everything
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Scale to unit length; zero vectors are returned unchanged
fn normalize_vector(vector: &[f32]) -> Vec<f32> {
    let magnitude: f32 = vector.iter().map(|&x| x * x).sum::<f32>().sqrt();
    if magnitude == 0.0 || !magnitude.is_finite() {
        return vector.to_vec();
    }
    vector.iter().map(|&x| x / magnitude).collect()
}
