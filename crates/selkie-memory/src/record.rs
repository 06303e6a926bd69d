//! Memory record model
//!
//! Records are immutable once created. A correction is a new record linked
//! back via `supersedes`; an authority upgrade is a new record linked via
//! `promoted_from`. The id is derived from content plus a high-resolution
//! timestamp, so identical content written twice yields distinct ids.

use crate::types::MemoryType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex characters of the content digest kept in a record id
const RECORD_ID_DIGEST_CHARS: usize = 16;

/// Prefix on every record id
const RECORD_ID_PREFIX: &str = "mem-";

/// Where a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Written by a human operator
    Human,
    /// Written by a registered agent
    Agent,
    /// Derived by the substrate itself (promotions)
    System,
    /// Brought in from an external store
    Import,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Human => "human",
            Self::Agent => "agent",
            Self::System => "system",
            Self::Import => "import",
        };
        write!(f, "{name}")
    }
}

/// Origin metadata attached to every record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Source kind
    pub source: SourceKind,
    /// Creation timestamp
    pub timestamp: DateTime<Utc>,
    /// Writing agent, when the source is an agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Conversation the record was captured in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// A single persisted memory record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Content-derived unique identifier
    pub id: String,
    /// Record kind
    #[serde(rename = "type")]
    pub kind: MemoryType,
    /// The memory content
    pub content: String,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Origin metadata
    pub provenance: Provenance,
    /// Why this record exists (required for decision/constraint)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Confidence 0.0-1.0 (required for lesson/hypothesis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Grouping label for scoped recall
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// When this record stops being returned by default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Id of the record this one corrects (lineage only, never ownership)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<String>,
    /// Id of the record this one was upgraded from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted_from: Option<String>,
}

impl MemoryRecord {
    /// Authority level of this record's kind
    pub fn authority(&self) -> u8 {
        self.kind.authority()
    }

    /// Whether the record has lapsed as of `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(exp) if exp < now)
    }

    /// Composite text embedded for semantic search
    pub fn index_text(&self) -> String {
        let mut text = format!("{}: {}", self.kind, self.content);
        if !self.tags.is_empty() {
            text.push_str(&format!(" [{}]", self.tags.join(", ")));
        }
        if let Some(rationale) = &self.rationale {
            text.push_str(&format!(" Rationale: {rationale}"));
        }
        text
    }
}

/// Fields supplied by a writer; the log fills in id and timestamp
#[derive(Debug, Clone)]
pub struct RecordDraft {
    pub kind: MemoryType,
    pub content: String,
    pub tags: Vec<String>,
    pub source: SourceKind,
    pub agent_id: Option<String>,
    pub conversation_id: Option<String>,
    pub rationale: Option<String>,
    pub confidence: Option<f64>,
    pub context: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub supersedes: Option<String>,
    pub promoted_from: Option<String>,
}

impl RecordDraft {
    /// Start a draft with the required fields
    pub fn new(kind: MemoryType, content: impl Into<String>, source: SourceKind) -> Self {
        Self {
            kind,
            content: content.into(),
            tags: Vec::new(),
            source,
            agent_id: None,
            conversation_id: None,
            rationale: None,
            confidence: None,
            context: None,
            expires_at: None,
            supersedes: None,
            promoted_from: None,
        }
    }

    /// Attach tags
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Attach the writing agent
    pub fn agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Attach a rationale
    pub fn rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    /// Attach a confidence score
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Attach a context label
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Seal the draft into a record stamped at `now`
    pub(crate) fn seal(self, now: DateTime<Utc>) -> MemoryRecord {
        let id = derive_record_id(&self.content, now);
        MemoryRecord {
            id,
            kind: self.kind,
            content: self.content,
            tags: self.tags,
            provenance: Provenance {
                source: self.source,
                timestamp: now,
                agent_id: self.agent_id,
                conversation_id: self.conversation_id,
            },
            rationale: self.rationale,
            confidence: self.confidence,
            context: self.context,
            expires_at: self.expires_at,
            supersedes: self.supersedes,
            promoted_from: self.promoted_from,
        }
    }
}

/// Derive a record id from content plus a nanosecond-resolution timestamp
fn derive_record_id(content: &str, now: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher.update(now.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true).as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{RECORD_ID_PREFIX}{}", &digest[..RECORD_ID_DIGEST_CHARS])
}
