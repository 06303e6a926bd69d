//! Append-only audit trail
//!
//! Every admitted request lands here as one JSON object per line, never
//! rewritten. Appends are best-effort by contract: a logging failure must
//! never veto the action it describes, so `record` warns and returns
//! instead of erroring.

use chrono::{DateTime, Utc};
use selkie_core::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Agent id recorded for admin-tier actions
pub const ADMIN_ACTOR: &str = "admin";

/// One audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the action was admitted
    pub timestamp: DateTime<Utc>,
    /// Acting agent, or `"admin"`
    pub agent_id: String,
    /// Action name (`search`, `write`, `register_agent`, ...)
    pub action: String,
    /// Action-specific fields, merged into the entry
    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
}

/// Append-only, line-delimited audit log
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    /// Serializes appends so concurrent entries never interleave bytes
    writer: Mutex<()>,
}

impl AuditLog {
    /// Open (or start) the audit stream at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            writer: Mutex::new(()),
        })
    }

    /// Record an action
    ///
    /// `details` should be a JSON object; its fields merge into the entry.
    /// Never fails the enclosing request.
    pub async fn record(&self, agent_id: &str, action: &str, details: Value) {
        let mut details = match details {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("details".to_string(), other);
                map
            }
        };
        // fixed entry fields win over colliding detail keys
        for reserved in ["timestamp", "agent_id", "action"] {
            details.remove(reserved);
        }

        let entry = AuditEntry {
            timestamp: Utc::now(),
            agent_id: agent_id.to_string(),
            action: action.to_string(),
            details,
        };

        let _guard = self.writer.lock().await;
        if let Err(err) = self.append(&entry) {
            tracing::warn!(error = %err, action, "audit append failed");
        }
    }

    fn append(&self, entry: &AuditEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(entry)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Most recent entries in chronological order
    ///
    /// Optionally filtered to one agent. Unparsable lines are skipped, not
    /// fatal: a torn tail write must not break audit queries.
    pub async fn recent(&self, limit: usize, agent_id: Option<&str>) -> Vec<AuditEntry> {
        let _guard = self.writer.lock().await;
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            return Vec::new();
        };

        let entries: Vec<AuditEntry> = raw
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .filter(|entry: &AuditEntry| {
                agent_id.map_or(true, |id| entry.agent_id == id)
            })
            .collect();

        let start = entries.len().saturating_sub(limit);
        entries[start..].to_vec()
    }
}
