//! Semantic index: active snapshot slot plus build/search operations
//!
//! Many concurrent searches read the active snapshot; exactly one writer
//! (the rebuild scheduler) replaces it. Replacement is a single reference
//! swap under a short write lock: in-flight searches finish against the
//! old snapshot, new searches see the new one immediately.

use crate::embedder::{normalize, Embedder};
use crate::snapshot::{IndexEntry, IndexSnapshot, ScoredEntry};
use chrono::{DateTime, Utc};
use selkie_core::{Error, Result};
use selkie_memory::MemoryRecord;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Index state reported by `/v1/stats` and `/health`
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    /// Whether any snapshot has ever been installed
    pub built: bool,
    /// Entries in the active snapshot
    pub entries: usize,
    /// Log length the active snapshot was built from
    pub log_len: usize,
    /// When the active snapshot finished building
    pub built_at: Option<DateTime<Utc>>,
}

/// Semantic search over the active snapshot
pub struct SemanticIndex {
    embedder: Arc<dyn Embedder>,
    active: RwLock<Option<Arc<IndexSnapshot>>>,
    snapshot_path: Option<PathBuf>,
}

impl std::fmt::Debug for SemanticIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticIndex")
            .field("model", &self.embedder.model_name())
            .field("dimension", &self.embedder.dimension())
            .finish()
    }
}

impl SemanticIndex {
    /// Create an index with no active snapshot
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            active: RwLock::new(None),
            snapshot_path: None,
        }
    }

    /// Create an index that persists installed snapshots to `path`
    pub fn with_persistence(embedder: Arc<dyn Embedder>, path: impl AsRef<Path>) -> Self {
        Self {
            embedder,
            active: RwLock::new(None),
            snapshot_path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Build a snapshot from a log state
    ///
    /// Embeds every record's composite text in one batch. This is the slow
    /// bulk operation; callers must keep it off the request path.
    pub async fn build(
        &self,
        records: &[MemoryRecord],
        log_len: usize,
    ) -> Result<IndexSnapshot> {
        let texts: Vec<String> = records.iter().map(MemoryRecord::index_text).collect();
        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();

        let mut vectors = self.embedder.embed_batch(&text_refs).await?;
        let dimension = self.embedder.dimension();

        let mut flat = Vec::with_capacity(vectors.len() * dimension);
        for vector in &mut vectors {
            if vector.len() != dimension {
                return Err(Error::upstream(format!(
                    "embedder returned {} dims, expected {dimension}",
                    vector.len()
                )));
            }
            normalize(vector);
            flat.extend_from_slice(vector);
        }

        let entries = records
            .iter()
            .map(|record| IndexEntry {
                id: record.id.clone(),
                kind: record.kind,
                content: record.content.clone(),
                tags: record.tags.clone(),
                authority: record.authority(),
            })
            .collect();

        Ok(IndexSnapshot {
            log_len,
            dimension,
            built_at: Utc::now(),
            entries,
            vectors: flat,
        })
    }

    /// Publish a snapshot as active and persist it best-effort
    pub fn install(&self, snapshot: Arc<IndexSnapshot>) {
        if let Some(path) = &self.snapshot_path {
            if let Err(err) = persist_snapshot(path, &snapshot) {
                tracing::warn!(error = %err, "failed to persist index snapshot");
            }
        }

        let entries = snapshot.len();
        let log_len = snapshot.log_len;
        match self.active.write() {
            Ok(mut active) => *active = Some(snapshot),
            Err(poisoned) => *poisoned.into_inner() = Some(snapshot),
        }
        tracing::info!(entries, log_len, "installed index snapshot");
    }

    /// Restore the persisted snapshot from disk, if any
    ///
    /// Skips restoration (with a warning) when the stored dimension does
    /// not match the configured embedder.
    pub fn load_persisted(&self) -> Result<bool> {
        let Some(path) = &self.snapshot_path else {
            return Ok(false);
        };
        if !path.exists() {
            return Ok(false);
        }

        let raw = std::fs::read_to_string(path)?;
        let snapshot: IndexSnapshot = serde_json::from_str(&raw)?;

        if snapshot.dimension != self.embedder.dimension() {
            tracing::warn!(
                stored = snapshot.dimension,
                configured = self.embedder.dimension(),
                "persisted snapshot dimension mismatch, ignoring"
            );
            return Ok(false);
        }

        let entries = snapshot.len();
        match self.active.write() {
            Ok(mut active) => *active = Some(Arc::new(snapshot)),
            Err(poisoned) => *poisoned.into_inner() = Some(Arc::new(snapshot)),
        }
        tracing::info!(entries, path = %path.display(), "restored index snapshot");
        Ok(true)
    }

    /// Top-k most similar entries for a text query
    ///
    /// Fails with `IndexUnavailable` when no snapshot has ever been built;
    /// callers are told to trigger a build rather than silently getting
    /// empty results.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredEntry>> {
        let snapshot = self.active_snapshot().ok_or(Error::IndexUnavailable)?;

        let mut query_vec = self.embedder.embed(query).await?;
        normalize(&mut query_vec);

        Ok(snapshot.top_k(&query_vec, k))
    }

    /// Current active snapshot, if any
    pub fn active_snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        match self.active.read() {
            Ok(active) => active.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Status summary for stats/health reporting
    pub fn status(&self) -> IndexStatus {
        match self.active_snapshot() {
            Some(snapshot) => IndexStatus {
                built: true,
                entries: snapshot.len(),
                log_len: snapshot.log_len,
                built_at: Some(snapshot.built_at),
            },
            None => IndexStatus {
                built: false,
                entries: 0,
                log_len: 0,
                built_at: None,
            },
        }
    }
}

/// Write the snapshot atomically next to its final path
fn persist_snapshot(path: &Path, snapshot: &IndexSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, serde_json::to_string(snapshot)?)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}
