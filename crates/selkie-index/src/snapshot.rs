//! Immutable index snapshots
//!
//! A snapshot is a point-in-time view of the memory log at a known length:
//! per-record metadata in parallel with unit-normalized embedding vectors,
//! searchable by exact inner product. Snapshots are never mutated; the
//! active one is replaced wholesale by the rebuild scheduler.

use chrono::{DateTime, Utc};
use selkie_memory::MemoryType;
use serde::{Deserialize, Serialize};

/// Metadata kept per indexed record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Record id
    pub id: String,
    /// Record kind
    #[serde(rename = "type")]
    pub kind: MemoryType,
    /// Record content
    pub content: String,
    /// Record tags
    pub tags: Vec<String>,
    /// Authority of the record's kind, denormalized for ranking
    pub authority: u8,
}

/// One search hit: an entry plus its similarity score
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: IndexEntry,
    pub score: f32,
}

/// Immutable, queryable copy of the semantic index at a specific log length
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Log length this snapshot was built from
    pub log_len: usize,
    /// Embedding dimension
    pub dimension: usize,
    /// Build completion time
    pub built_at: DateTime<Utc>,
    /// Per-record metadata, parallel to `vectors`
    pub entries: Vec<IndexEntry>,
    /// Row-major unit vectors, `entries.len() * dimension` long
    pub vectors: Vec<f32>,
}

impl IndexSnapshot {
    /// Number of indexed entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vector for entry `i`
    fn vector(&self, i: usize) -> &[f32] {
        let start = i * self.dimension;
        &self.vectors[start..start + self.dimension]
    }

    /// Exact top-k by inner product against a unit-normalized query
    ///
    /// Returns all entries when `k` exceeds the snapshot size. Ties and
    /// NaN-free ordering are resolved toward lower entry index.
    pub fn top_k(&self, query: &[f32], k: usize) -> Vec<ScoredEntry> {
        debug_assert_eq!(query.len(), self.dimension);

        let mut scored: Vec<(usize, f32)> = (0..self.entries.len())
            .map(|i| {
                let score = self
                    .vector(i)
                    .iter()
                    .zip(query)
                    .map(|(a, b)| a * b)
                    .sum::<f32>();
                (i, score)
            })
            .collect();

        scored.sort_by(|(ia, sa), (ib, sb)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(ia.cmp(ib))
        });

        scored
            .into_iter()
            .take(k)
            .map(|(i, score)| ScoredEntry {
                entry: self.entries[i].clone(),
                score,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, kind: MemoryType) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            kind,
            content: format!("content of {id}"),
            tags: Vec::new(),
            authority: kind.authority(),
        }
    }

    /// Three axis-aligned unit vectors in 3d
    fn axis_snapshot() -> IndexSnapshot {
        IndexSnapshot {
            log_len: 3,
            dimension: 3,
            built_at: Utc::now(),
            entries: vec![
                entry("mem-x", MemoryType::Observation),
                entry("mem-y", MemoryType::Lesson),
                entry("mem-z", MemoryType::Constraint),
            ],
            vectors: vec![
                1.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, //
                0.0, 0.0, 1.0,
            ],
        }
    }

    #[test]
    fn test_top_k_orders_by_inner_product() {
        let snapshot = axis_snapshot();
        let query = [0.1, 0.9, 0.0];

        let hits = snapshot.top_k(&query, 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].entry.id, "mem-y");
        assert_eq!(hits[1].entry.id, "mem-x");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_top_k_clamps_to_snapshot_size() {
        let snapshot = axis_snapshot();
        let hits = snapshot.top_k(&[1.0, 0.0, 0.0], 50);
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_top_k_on_empty_snapshot() {
        let snapshot = IndexSnapshot {
            log_len: 0,
            dimension: 3,
            built_at: Utc::now(),
            entries: Vec::new(),
            vectors: Vec::new(),
        };
        assert!(snapshot.top_k(&[1.0, 0.0, 0.0], 5).is_empty());
    }

    #[test]
    fn test_snapshot_serde_round_trip() {
        let snapshot = axis_snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: IndexSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.entries, snapshot.entries);
        assert_eq!(parsed.vectors, snapshot.vectors);
        assert_eq!(parsed.log_len, 3);
    }
}
