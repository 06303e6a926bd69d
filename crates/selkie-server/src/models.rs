//! Wire models for the Selkie API
//!
//! Request bodies validate themselves against the limits in
//! `selkie_core::constants` before any state is touched.

use chrono::{DateTime, Utc};
use selkie_core::constants::*;
use selkie_core::{Error, Result};
use selkie_index::{IndexStatus, ScoredEntry};
use selkie_memory::MemoryType;
use selkie_registry::{Agent, AuditEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Agent-tier requests
// =============================================================================

/// Body of `POST /v1/search`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub memory_type: Option<MemoryType>,
    #[serde(default)]
    pub min_authority: u8,
}

fn default_top_k() -> usize {
    SEARCH_TOP_K_DEFAULT
}

impl SearchRequest {
    pub fn validate(&self) -> Result<()> {
        validate_query(&self.query)?;
        if self.top_k == 0 || self.top_k > SEARCH_TOP_K_MAX {
            return Err(Error::validation(format!(
                "top_k must be 1-{SEARCH_TOP_K_MAX}"
            )));
        }
        if self.min_authority > AUTHORITY_MAX {
            return Err(Error::validation(format!(
                "min_authority must be 0-{AUTHORITY_MAX}"
            )));
        }
        Ok(())
    }

    /// Whether any post-retrieval filter is active
    pub fn is_filtered(&self) -> bool {
        self.memory_type.is_some() || self.min_authority > 0
    }
}

/// Body of `POST /v1/context`
#[derive(Debug, Clone, Deserialize)]
pub struct ContextRequest {
    pub query: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

fn default_max_tokens() -> usize {
    CONTEXT_TOKENS_DEFAULT
}

impl ContextRequest {
    pub fn validate(&self) -> Result<()> {
        validate_query(&self.query)?;
        if !(CONTEXT_TOKENS_MIN..=CONTEXT_TOKENS_MAX).contains(&self.max_tokens) {
            return Err(Error::validation(format!(
                "max_tokens must be {CONTEXT_TOKENS_MIN}-{CONTEXT_TOKENS_MAX}"
            )));
        }
        Ok(())
    }
}

/// Body of `POST /v1/write`
#[derive(Debug, Clone, Deserialize)]
pub struct WriteRequest {
    pub content: String,
    pub memory_type: MemoryType,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl WriteRequest {
    pub fn validate(&self) -> Result<()> {
        if self.content.is_empty() || self.content.len() > CONTENT_LENGTH_CHARS_MAX {
            return Err(Error::validation(format!(
                "content length must be 1-{CONTENT_LENGTH_CHARS_MAX}"
            )));
        }
        if self.tags.len() > TAGS_COUNT_MAX {
            return Err(Error::validation(format!(
                "at most {TAGS_COUNT_MAX} tags"
            )));
        }
        if let Some(rationale) = &self.rationale {
            if rationale.len() > RATIONALE_LENGTH_CHARS_MAX {
                return Err(Error::validation(format!(
                    "rationale length must be at most {RATIONALE_LENGTH_CHARS_MAX}"
                )));
            }
        }
        if let Some(confidence) = self.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(Error::validation("confidence must be 0.0-1.0"));
            }
        }
        Ok(())
    }
}

fn validate_query(query: &str) -> Result<()> {
    if query.trim().is_empty() || query.len() > QUERY_LENGTH_CHARS_MAX {
        return Err(Error::validation(format!(
            "query length must be 1-{QUERY_LENGTH_CHARS_MAX}"
        )));
    }
    Ok(())
}

/// Query string of `GET /admin/audit`
#[derive(Debug, Clone, Deserialize)]
pub struct AuditQuery {
    #[serde(default = "default_audit_limit")]
    pub limit: usize,
    #[serde(default)]
    pub agent_id: Option<String>,
}

fn default_audit_limit() -> usize {
    AUDIT_QUERY_LIMIT_DEFAULT
}

impl AuditQuery {
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 || self.limit > AUDIT_QUERY_LIMIT_MAX {
            return Err(Error::validation(format!(
                "limit must be 1-{AUDIT_QUERY_LIMIT_MAX}"
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Responses
// =============================================================================

/// One search result on the wire
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MemoryType,
    pub content: String,
    pub score: f32,
    pub authority: u8,
    pub tags: Vec<String>,
}

impl From<ScoredEntry> for SearchHit {
    fn from(hit: ScoredEntry) -> Self {
        Self {
            id: hit.entry.id,
            kind: hit.entry.kind,
            content: hit.entry.content,
            score: hit.score,
            authority: hit.entry.authority,
            tags: hit.entry.tags,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub agent: String,
    pub query: String,
    pub results: Vec<SearchHit>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ContextResponse {
    pub agent: String,
    pub query: String,
    pub context: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct WriteResponse {
    pub agent: String,
    pub memory_id: String,
    pub status: &'static str,
    #[serde(rename = "type")]
    pub kind: MemoryType,
    pub authority: u8,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub agent: String,
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
    pub index: IndexStatus,
    pub timestamp: DateTime<Utc>,
}

/// One row of the public types table
#[derive(Debug, Serialize)]
pub struct TypeInfo {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub authority: u8,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TypesResponse {
    pub types: Vec<TypeInfo>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub index_built: bool,
    pub agents_registered: usize,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub status: &'static str,
    pub agent: Agent,
    pub api_key: String,
    pub warning: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AgentListResponse {
    pub agents: Vec<Agent>,
}

#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    pub status: &'static str,
    pub agent_id: String,
}

#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub entries: Vec<AuditEntry>,
}

#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    pub status: &'static str,
    pub index: IndexStatus,
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_defaults_and_validation() {
        let req: SearchRequest =
            serde_json::from_str(r#"{"query": "deploys"}"#).unwrap();
        assert_eq!(req.top_k, SEARCH_TOP_K_DEFAULT);
        assert_eq!(req.min_authority, 0);
        assert!(!req.is_filtered());
        assert!(req.validate().is_ok());

        let req: SearchRequest =
            serde_json::from_str(r#"{"query": "x", "top_k": 21}"#).unwrap();
        assert!(req.validate().is_err());

        let req: SearchRequest =
            serde_json::from_str(r#"{"query": "x", "min_authority": 4}"#).unwrap();
        assert!(req.is_filtered());
    }

    #[test]
    fn test_search_request_rejects_blank_query() {
        let req: SearchRequest = serde_json::from_str(r#"{"query": "   "}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_context_request_bounds() {
        let req: ContextRequest =
            serde_json::from_str(r#"{"query": "q", "max_tokens": 99}"#).unwrap();
        assert!(req.validate().is_err());

        let req: ContextRequest =
            serde_json::from_str(r#"{"query": "q", "max_tokens": 8001}"#).unwrap();
        assert!(req.validate().is_err());

        let req: ContextRequest = serde_json::from_str(r#"{"query": "q"}"#).unwrap();
        assert_eq!(req.max_tokens, CONTEXT_TOKENS_DEFAULT);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_write_request_validation() {
        let req: WriteRequest = serde_json::from_str(
            r#"{"content": "note", "memory_type": "observation"}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());

        let req: WriteRequest = serde_json::from_str(
            r#"{"content": "", "memory_type": "observation"}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());

        let req: WriteRequest = serde_json::from_str(
            r#"{"content": "x", "memory_type": "lesson", "confidence": 1.2}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_unknown_memory_type_fails_deserialization() {
        let result: std::result::Result<WriteRequest, _> = serde_json::from_str(
            r#"{"content": "x", "memory_type": "rumor"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_audit_query_limits() {
        let q: AuditQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.limit, AUDIT_QUERY_LIMIT_DEFAULT);
        assert!(q.validate().is_ok());

        let q: AuditQuery = serde_json::from_str(r#"{"limit": 1001}"#).unwrap();
        assert!(q.validate().is_err());
    }
}
