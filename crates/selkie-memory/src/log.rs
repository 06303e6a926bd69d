//! Append-only memory log
//!
//! The persisted state is a single JSON document (schema version, last
//! sync, ordered record list). All mutation is serialized through one
//! async mutex: the mutex holder is the only logical writer, so two
//! concurrent appends can never overwrite each other. The document is
//! rewritten via temp file + rename so a crash never leaves a torn file.

use crate::record::{MemoryRecord, RecordDraft, SourceKind};
use crate::types::MemoryType;
use chrono::{DateTime, Utc};
use selkie_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Document schema version written to new stores
const SCHEMA_VERSION: &str = "1.0";

/// Persisted document shape
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MemoryStore {
    schema_version: String,
    last_sync: Option<DateTime<Utc>>,
    records: Vec<MemoryRecord>,
}

impl MemoryStore {
    fn empty() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            last_sync: None,
            records: Vec::new(),
        }
    }
}

/// Filters for [`MemoryLog::query`]
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Only records of this kind
    pub kind: Option<MemoryType>,
    /// Only records from this source
    pub source: Option<SourceKind>,
    /// Records carrying any of these tags
    pub tags: Option<Vec<String>>,
    /// Only records with this context label
    pub context: Option<String>,
    /// Include records whose expiry has passed
    pub include_expired: bool,
}

impl RecordFilter {
    /// Filter matching every live record
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one kind
    pub fn kind(mut self, kind: MemoryType) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restrict to one source
    pub fn source(mut self, source: SourceKind) -> Self {
        self.source = Some(source);
        self
    }

    /// Restrict to records carrying any of the given tags
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Restrict to one context label
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Also return expired records
    pub fn include_expired(mut self) -> Self {
        self.include_expired = true;
        self
    }

    /// Check one record against this filter
    fn matches(&self, record: &MemoryRecord, now: DateTime<Utc>) -> bool {
        if let Some(kind) = self.kind {
            if record.kind != kind {
                return false;
            }
        }
        if let Some(source) = self.source {
            if record.provenance.source != source {
                return false;
            }
        }
        if let Some(tags) = &self.tags {
            if !tags.iter().any(|t| record.tags.contains(t)) {
                return false;
            }
        }
        if let Some(context) = &self.context {
            if record.context.as_deref() != Some(context.as_str()) {
                return false;
            }
        }
        if !self.include_expired && record.is_expired(now) {
            return false;
        }
        true
    }
}

/// Durable, append-only sequence of memory records
///
/// Append is the only mutating operation; supersede and promote read a
/// target record and append a new linked one.
#[derive(Debug)]
pub struct MemoryLog {
    path: PathBuf,
    inner: Mutex<MemoryStore>,
}

impl MemoryLog {
    /// Open the log at `path`, loading the existing document if present
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            MemoryStore::empty()
        };

        tracing::info!(
            path = %path.display(),
            records = store.records.len(),
            "opened memory log"
        );

        Ok(Self {
            path,
            inner: Mutex::new(store),
        })
    }

    /// Append a record, validating per-type required fields first
    ///
    /// The record either fully exists in the log afterward or not at all:
    /// a persistence failure rolls the in-memory append back.
    pub async fn append(&self, draft: RecordDraft) -> Result<MemoryRecord> {
        validate_draft(&draft)?;

        let mut store = self.inner.lock().await;
        let now = Utc::now();
        let record = draft.seal(now);

        store.records.push(record.clone());
        store.last_sync = Some(now);

        if let Err(err) = persist(&self.path, &store) {
            store.records.pop();
            return Err(err);
        }

        tracing::debug!(
            id = %record.id,
            kind = %record.kind,
            content_len = record.content.len(),
            "appended memory record"
        );
        Ok(record)
    }

    /// Query records, sorted by descending authority (stable on log order)
    pub async fn query(&self, filter: &RecordFilter) -> Vec<MemoryRecord> {
        let store = self.inner.lock().await;
        let now = Utc::now();

        let mut results: Vec<MemoryRecord> = store
            .records
            .iter()
            .filter(|record| filter.matches(record, now))
            .cloned()
            .collect();

        results.sort_by_key(|record| std::cmp::Reverse(record.authority()));
        results
    }

    /// Fetch one record by id
    pub async fn get(&self, id: &str) -> Result<MemoryRecord> {
        let store = self.inner.lock().await;
        store
            .records
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found("memory", id))
    }

    /// Correct a record: append a new one linked via `supersedes`
    ///
    /// The original is untouched. Kind, tags, context, and confidence carry
    /// over; the rationale falls back to the original's when not given.
    pub async fn supersede(
        &self,
        id: &str,
        new_content: impl Into<String>,
        source: SourceKind,
        rationale: Option<String>,
    ) -> Result<MemoryRecord> {
        let original = self.get(id).await?;

        let mut draft = RecordDraft::new(original.kind, new_content, source);
        draft.tags = original.tags.clone();
        draft.context = original.context.clone();
        draft.confidence = original.confidence;
        draft.rationale = rationale.or(original.rationale);
        draft.supersedes = Some(original.id);

        self.append(draft).await
    }

    /// Upgrade a record to another kind: append a new one linked via
    /// `promoted_from`, with source recorded as the substrate itself
    pub async fn promote(
        &self,
        id: &str,
        new_kind: MemoryType,
        rationale: Option<String>,
        confidence: Option<f64>,
    ) -> Result<MemoryRecord> {
        let original = self.get(id).await?;

        let mut draft = RecordDraft::new(new_kind, original.content.clone(), SourceKind::System);
        draft.tags = original.tags.clone();
        draft.context = original.context.clone();
        draft.rationale = rationale;
        draft.confidence = confidence;
        draft.promoted_from = Some(original.id);

        self.append(draft).await
    }

    /// Current record count
    pub async fn len(&self) -> usize {
        self.inner.lock().await.records.len()
    }

    /// Whether the log holds no records
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Cloned view of all records plus the log length it was taken at,
    /// for index builds
    pub async fn records(&self) -> (Vec<MemoryRecord>, usize) {
        let store = self.inner.lock().await;
        (store.records.clone(), store.records.len())
    }

    /// Record counts grouped by kind name
    pub async fn counts_by_kind(&self) -> BTreeMap<String, usize> {
        let store = self.inner.lock().await;
        let mut counts = BTreeMap::new();
        for record in &store.records {
            *counts.entry(record.kind.as_str().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Timestamp of the last persisted append
    pub async fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().await.last_sync
    }
}

/// Reject drafts missing per-type required fields
fn validate_draft(draft: &RecordDraft) -> Result<()> {
    let meta = draft.kind.metadata();

    if meta.requires_rationale && draft.rationale.as_deref().map_or(true, str::is_empty) {
        return Err(Error::validation(format!(
            "{} requires rationale",
            draft.kind
        )));
    }
    if meta.requires_confidence && draft.confidence.is_none() {
        return Err(Error::validation(format!(
            "{} requires confidence score",
            draft.kind
        )));
    }
    if let Some(confidence) = draft.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::validation(format!(
                "confidence {confidence} outside 0.0-1.0"
            )));
        }
    }
    Ok(())
}

/// Write the document atomically: temp file in the same directory, then rename
fn persist(path: &Path, store: &MemoryStore) -> Result<()> {
    let temp_path = path.with_extension("json.tmp");
    {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&temp_path)?;
        let body = serde_json::to_string_pretty(store)?;
        file.write_all(body.as_bytes())?;
    }
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn observation(content: &str) -> RecordDraft {
        RecordDraft::new(MemoryType::Observation, content, SourceKind::Agent)
    }

    async fn open_log(dir: &tempfile::TempDir) -> MemoryLog {
        MemoryLog::open(dir.path().join("memories.json")).expect("open log")
    }

    #[tokio::test]
    async fn test_append_and_len() {
        let dir = tempdir().unwrap();
        let log = open_log(&dir).await;

        let record = log.append(observation("first")).await.unwrap();
        assert!(record.id.starts_with("mem-"));
        assert_eq!(log.len().await, 1);
    }

    #[tokio::test]
    async fn test_append_rejects_missing_required_fields() {
        let dir = tempdir().unwrap();
        let log = open_log(&dir).await;

        // decision without rationale
        let draft = RecordDraft::new(MemoryType::Decision, "use sqlite", SourceKind::Agent);
        assert!(matches!(
            log.append(draft).await,
            Err(Error::Validation { .. })
        ));

        // hypothesis without confidence
        let draft = RecordDraft::new(MemoryType::Hypothesis, "maybe", SourceKind::Agent);
        assert!(matches!(
            log.append(draft).await,
            Err(Error::Validation { .. })
        ));

        // confidence out of range
        let draft = RecordDraft::new(MemoryType::Lesson, "learned", SourceKind::Agent)
            .confidence(1.5);
        assert!(matches!(
            log.append(draft).await,
            Err(Error::Validation { .. })
        ));

        // rejected before any mutation
        assert_eq!(log.len().await, 0);
    }

    #[tokio::test]
    async fn test_query_sorts_by_descending_authority_stable() {
        let dir = tempdir().unwrap();
        let log = open_log(&dir).await;

        log.append(observation("obs-a")).await.unwrap();
        log.append(
            RecordDraft::new(MemoryType::Constraint, "never force-push", SourceKind::Human)
                .rationale("protects shared history"),
        )
        .await
        .unwrap();
        log.append(observation("obs-b")).await.unwrap();

        let results = log.query(&RecordFilter::new()).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].kind, MemoryType::Constraint);
        // stable: observations keep their log order
        assert_eq!(results[1].content, "obs-a");
        assert_eq!(results[2].content, "obs-b");
    }

    #[tokio::test]
    async fn test_query_filters() {
        let dir = tempdir().unwrap();
        let log = open_log(&dir).await;

        log.append(observation("tagged").tags(vec!["infra".to_string()]))
            .await
            .unwrap();
        log.append(observation("contextual").context("deploys"))
            .await
            .unwrap();
        log.append(
            RecordDraft::new(MemoryType::Preference, "dark mode", SourceKind::Human),
        )
        .await
        .unwrap();

        let by_kind = log
            .query(&RecordFilter::new().kind(MemoryType::Preference))
            .await;
        assert_eq!(by_kind.len(), 1);
        assert_eq!(by_kind[0].content, "dark mode");

        let by_source = log
            .query(&RecordFilter::new().source(SourceKind::Human))
            .await;
        assert_eq!(by_source.len(), 1);

        let by_tag = log
            .query(&RecordFilter::new().tags(vec!["infra".to_string(), "other".to_string()]))
            .await;
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].content, "tagged");

        let by_context = log.query(&RecordFilter::new().context("deploys")).await;
        assert_eq!(by_context.len(), 1);
        assert_eq!(by_context[0].content, "contextual");
    }

    #[tokio::test]
    async fn test_query_skips_expired_unless_included() {
        let dir = tempdir().unwrap();
        let log = open_log(&dir).await;

        let mut draft = observation("stale");
        draft.expires_at = Some(Utc::now() - chrono::Duration::hours(1));
        log.append(draft).await.unwrap();

        assert!(log.query(&RecordFilter::new()).await.is_empty());
        assert_eq!(
            log.query(&RecordFilter::new().include_expired()).await.len(),
            1
        );
    }

    #[tokio::test]
    async fn test_supersede_links_and_preserves_original() {
        let dir = tempdir().unwrap();
        let log = open_log(&dir).await;

        let original = log
            .append(observation("port is 7437").tags(vec!["net".to_string()]))
            .await
            .unwrap();
        let replacement = log
            .supersede(&original.id, "port is 7438", SourceKind::Agent, None)
            .await
            .unwrap();

        assert_eq!(replacement.supersedes.as_deref(), Some(original.id.as_str()));
        assert_eq!(replacement.kind, original.kind);
        assert_eq!(replacement.tags, original.tags);
        assert_eq!(log.len().await, 2);
        // original untouched
        assert_eq!(log.get(&original.id).await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_supersede_unknown_id_fails() {
        let dir = tempdir().unwrap();
        let log = open_log(&dir).await;

        let result = log
            .supersede("mem-missing", "new", SourceKind::Agent, None)
            .await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        assert_eq!(log.len().await, 0);
    }

    #[tokio::test]
    async fn test_promote_creates_system_record() {
        let dir = tempdir().unwrap();
        let log = open_log(&dir).await;

        let original = log.append(observation("retries fix flakes")).await.unwrap();
        let promoted = log
            .promote(
                &original.id,
                MemoryType::Lesson,
                None,
                Some(0.9),
            )
            .await
            .unwrap();

        assert_eq!(promoted.kind, MemoryType::Lesson);
        assert_eq!(promoted.provenance.source, SourceKind::System);
        assert_eq!(promoted.promoted_from.as_deref(), Some(original.id.as_str()));
        assert_eq!(promoted.content, original.content);
    }

    #[tokio::test]
    async fn test_promote_enforces_target_type_requirements() {
        let dir = tempdir().unwrap();
        let log = open_log(&dir).await;

        let original = log.append(observation("always lint")).await.unwrap();
        // promoting to constraint without rationale must fail
        let result = log
            .promote(&original.id, MemoryType::Constraint, None, None)
            .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert_eq!(log.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_appends_lose_nothing() {
        let dir = tempdir().unwrap();
        let log = Arc::new(open_log(&dir).await);

        let writers = 16;
        let mut handles = Vec::new();
        for i in 0..writers {
            let log = Arc::clone(&log);
            handles.push(tokio::spawn(async move {
                log.append(observation(&format!("write {i}"))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(log.len().await, writers);

        // the persisted document agrees with memory
        let reopened = open_log(&dir).await;
        assert_eq!(reopened.len().await, writers);
    }

    #[tokio::test]
    async fn test_document_round_trips_through_reopen() {
        let dir = tempdir().unwrap();
        let record = {
            let log = open_log(&dir).await;
            log.append(
                RecordDraft::new(MemoryType::Decision, "pin tokio", SourceKind::Agent)
                    .rationale("avoid surprise upgrades")
                    .tags(vec!["deps".to_string()]),
            )
            .await
            .unwrap()
        };

        let reopened = open_log(&dir).await;
        assert_eq!(reopened.len().await, 1);
        assert_eq!(reopened.get(&record.id).await.unwrap(), record);
        assert!(reopened.last_sync().await.is_some());
    }

    #[tokio::test]
    async fn test_counts_by_kind() {
        let dir = tempdir().unwrap();
        let log = open_log(&dir).await;

        log.append(observation("one")).await.unwrap();
        log.append(observation("two")).await.unwrap();
        log.append(RecordDraft::new(MemoryType::Goal, "ship", SourceKind::Agent))
            .await
            .unwrap();

        let counts = log.counts_by_kind().await;
        assert_eq!(counts.get("observation"), Some(&2));
        assert_eq!(counts.get("goal"), Some(&1));
        assert_eq!(counts.get("constraint"), None);
    }
}
