//! Agent registry and admission control
//!
//! One registry object owns all agent state behind a single async mutex:
//! registration, key verification, sliding-window rate limiting, and
//! authority ceilings. Agents and key hashes persist to a JSON document;
//! rate windows are in-memory only and reset on restart.

use crate::agent::{Agent, RegisterAgentSpec};
use chrono::{DateTime, NaiveDate, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use selkie_core::constants::{API_KEY_MATERIAL_BYTES, API_KEY_PREFIX, RATE_WINDOW_SECS};
use selkie_core::{Error, Result};
use selkie_memory::MemoryType;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Persisted registry document: agents plus key-hash mapping
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDoc {
    agents: HashMap<String, Agent>,
    /// SHA-256 hex of an issued key -> agent_id
    keys: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    doc: RegistryDoc,
    /// Per-agent admission timestamps within the rolling window
    windows: HashMap<String, VecDeque<DateTime<Utc>>>,
    /// UTC day `requests_today` currently counts
    counting_day: HashMap<String, NaiveDate>,
}

/// Registry of agents and their admission state
#[derive(Debug)]
pub struct AgentRegistry {
    path: Option<PathBuf>,
    inner: Mutex<RegistryInner>,
}

impl AgentRegistry {
    /// Open a registry persisted at `path`, loading existing agents
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let doc = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            RegistryDoc::default()
        };

        tracing::info!(agents = doc.agents.len(), path = %path.display(), "opened agent registry");

        Ok(Self {
            path: Some(path),
            inner: Mutex::new(RegistryInner {
                doc,
                ..RegistryInner::default()
            }),
        })
    }

    /// Ephemeral registry with no persistence (tests, embedded use)
    pub fn in_memory() -> Self {
        Self {
            path: None,
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Register a new agent, returning it with its plaintext API key
    ///
    /// The key is shown exactly once; only its hash is stored.
    pub async fn register(&self, spec: RegisterAgentSpec) -> Result<(Agent, String)> {
        spec.validate()?;

        let mut inner = self.inner.lock().await;
        if inner.doc.agents.contains_key(&spec.agent_id) {
            return Err(Error::conflict("agent", spec.agent_id));
        }

        let api_key = generate_api_key();
        let agent = spec.into_agent(Utc::now());

        inner
            .doc
            .keys
            .insert(hash_key(&api_key), agent.agent_id.clone());
        inner.doc.agents.insert(agent.agent_id.clone(), agent.clone());
        persist(&self.path, &inner.doc)?;

        tracing::info!(agent_id = %agent.agent_id, "registered agent");
        Ok((agent, api_key))
    }

    /// Resolve a plaintext API key to its agent
    pub async fn verify(&self, api_key: &str) -> Result<Agent> {
        let inner = self.inner.lock().await;
        let agent_id = inner
            .doc
            .keys
            .get(&hash_key(api_key))
            .ok_or_else(|| Error::auth("invalid API key"))?;
        inner
            .doc
            .agents
            .get(agent_id)
            .cloned()
            .ok_or_else(|| Error::auth("invalid API key"))
    }

    /// Admit one request under the agent's sliding-window quota
    ///
    /// Prunes timestamps older than the window, rejects without recording
    /// when the quota is spent, and records the admission otherwise.
    pub async fn check_and_record_rate(&self, agent_id: &str) -> Result<()> {
        self.check_and_record_rate_at(agent_id, Utc::now()).await
    }

    /// Clock-injected admission check (the production path passes `now`)
    pub async fn check_and_record_rate_at(
        &self,
        agent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let rate_limit = inner
            .doc
            .agents
            .get(agent_id)
            .ok_or_else(|| Error::not_found("agent", agent_id))?
            .rate_limit;

        let horizon = now - chrono::Duration::seconds(RATE_WINDOW_SECS);
        let window = inner.windows.entry(agent_id.to_string()).or_default();
        while window.front().is_some_and(|t| *t <= horizon) {
            window.pop_front();
        }

        if window.len() as u32 >= rate_limit {
            return Err(Error::RateLimit { limit: rate_limit });
        }
        window.push_back(now);

        // roll the per-day counter
        let today = now.date_naive();
        let day = inner
            .counting_day
            .entry(agent_id.to_string())
            .or_insert(today);
        let rolled = *day != today;
        *day = today;
        if let Some(agent) = inner.doc.agents.get_mut(agent_id) {
            if rolled {
                agent.requests_today = 0;
            }
            agent.requests_today += 1;
        }

        Ok(())
    }

    /// Reject writes whose type exceeds the agent's authority ceiling
    pub fn ensure_authority(agent: &Agent, kind: MemoryType) -> Result<()> {
        let required = kind.authority();
        if required > agent.max_authority {
            return Err(Error::Authority {
                memory_type: kind.as_str().to_string(),
                required,
                ceiling: agent.max_authority,
            });
        }
        Ok(())
    }

    /// Bump lifetime read/write counters, persisting best-effort
    pub async fn record_usage(&self, agent_id: &str, is_write: bool) {
        let mut inner = self.inner.lock().await;
        let Some(agent) = inner.doc.agents.get_mut(agent_id) else {
            return;
        };
        if is_write {
            agent.total_writes += 1;
        } else {
            agent.total_reads += 1;
        }
        if let Err(err) = persist(&self.path, &inner.doc) {
            tracing::warn!(error = %err, "failed to persist usage counters");
        }
    }

    /// Revoke an agent: removes it and every key hash pointing at it
    ///
    /// Idempotent; returns false when the agent is unknown.
    pub async fn revoke(&self, agent_id: &str) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.doc.agents.remove(agent_id).is_none() {
            return false;
        }
        inner.doc.keys.retain(|_, id| id != agent_id);
        inner.windows.remove(agent_id);
        inner.counting_day.remove(agent_id);

        if let Err(err) = persist(&self.path, &inner.doc) {
            tracing::warn!(error = %err, "failed to persist revocation");
        }
        tracing::info!(agent_id, "revoked agent");
        true
    }

    /// Fetch one agent by id
    pub async fn get(&self, agent_id: &str) -> Option<Agent> {
        self.inner.lock().await.doc.agents.get(agent_id).cloned()
    }

    /// All registered agents, sorted by id (key hashes never leave)
    pub async fn list(&self) -> Vec<Agent> {
        let inner = self.inner.lock().await;
        let mut agents: Vec<Agent> = inner.doc.agents.values().cloned().collect();
        agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        agents
    }

    /// Registered agent count
    pub async fn agent_count(&self) -> usize {
        self.inner.lock().await.doc.agents.len()
    }
}

/// Generate a fresh API key from OS randomness
fn generate_api_key() -> String {
    let mut material = [0u8; API_KEY_MATERIAL_BYTES];
    OsRng.fill_bytes(&mut material);
    format!("{API_KEY_PREFIX}{}", hex::encode(material))
}

/// SHA-256 hex of a plaintext key
fn hash_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Write the registry document atomically when persistence is configured
fn persist(path: &Option<PathBuf>, doc: &RegistryDoc) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, serde_json::to_string_pretty(doc)?)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}
