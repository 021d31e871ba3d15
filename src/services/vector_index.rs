//! In-memory exact nearest-neighbour index.
//!
//! The index is write-once: [`VectorIndex::build`] replaces the whole content
//! atomically and afterwards the index is only queried. Insertion position is
//! the retrieval key and doubles as the tie-breaker between equal scores.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::error::IndexError;
use crate::models::{EmbeddedChunk, QueryResult, ScoredChunk, SimilarityMetric};
use crate::services::embedding::normalize;

#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    metric: SimilarityMetric,
    dimension: Option<usize>,
    entries: Vec<EmbeddedChunk>,
}

impl VectorIndex {
    pub fn new(metric: SimilarityMetric) -> Self {
        Self {
            metric,
            dimension: None,
            entries: Vec::new(),
        }
    }

    /// Replace the index content with `entries`.
    ///
    /// Every vector must have the dimension of the first one; on mismatch the
    /// previous content is left untouched.
    pub fn build(&mut self, entries: Vec<EmbeddedChunk>) -> Result<(), IndexError> {
        let dimension = entries.first().map(EmbeddedChunk::dimension);

        if let Some(expected) = dimension {
            if let Some((position, entry)) = entries
                .iter()
                .enumerate()
                .find(|(_, e)| e.dimension() != expected || e.dimension() == 0)
            {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    found: entry.dimension(),
                    position,
                });
            }
        }

        self.entries = entries
            .into_iter()
            .map(|e| EmbeddedChunk::new(e.chunk, normalize(&e.vector)))
            .collect();
        self.dimension = dimension;
        Ok(())
    }

    /// Return the `k` entries most similar to `query`, best first.
    ///
    /// Equal scores rank the earlier-inserted entry first. With fewer than `k`
    /// entries, all of them are returned.
    pub fn search(&self, query: &[f32], k: usize) -> Result<QueryResult, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidLimit);
        }
        let dimension = match self.dimension {
            Some(d) if !self.entries.is_empty() => d,
            _ => return Err(IndexError::EmptyIndex),
        };
        if query.len() != dimension {
            return Err(IndexError::QueryDimensionMismatch {
                expected: dimension,
                found: query.len(),
            });
        }

        let query = normalize(query);
        let mut heap: BinaryHeap<Reverse<Candidate>> = BinaryHeap::with_capacity(k + 1);

        for (position, entry) in self.entries.iter().enumerate() {
            let score = self.score(&query, &entry.vector);
            heap.push(Reverse(Candidate { score, position }));
            if heap.len() > k {
                heap.pop();
            }
        }

        let mut best: Vec<Candidate> = heap.into_iter().map(|Reverse(c)| c).collect();
        best.sort_by(|a, b| b.cmp(a));

        let hits = best
            .into_iter()
            .map(|c| ScoredChunk {
                chunk: self.entries[c.position].chunk.clone(),
                score: c.score,
                position: c.position,
            })
            .collect();

        Ok(QueryResult::new(hits))
    }

    fn score(&self, query: &[f32], stored: &[f32]) -> f32 {
        match self.metric {
            SimilarityMetric::Cosine => dot(query, stored).clamp(-1.0, 1.0),
            SimilarityMetric::Euclidean => {
                let dist = query
                    .iter()
                    .zip(stored)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f32>()
                    .sqrt();
                1.0 / (1.0 + dist)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Ranking key: higher score wins, then lower position.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f32,
    position: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.position.cmp(&self.position))
    }
}
