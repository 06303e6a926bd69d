//! Agent identity model
//!
//! Agents are created by registration and never deleted from history;
//! revocation removes access, not the record of past writes (provenance
//! in the memory log keeps referencing revoked agent ids).

use chrono::{DateTime, Utc};
use selkie_core::constants::*;
use selkie_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// A registered agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Immutable unique identifier, `[a-z0-9_-]`
    pub agent_id: String,
    /// Display name
    pub name: String,
    /// Optional free-form description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Requests admitted per rolling hour
    pub rate_limit: u32,
    /// Ceiling on the authority of writable record types, 0-5
    pub max_authority: u8,
    /// Registration time
    pub created_at: DateTime<Utc>,
    /// Lifetime read-request count
    #[serde(default)]
    pub total_reads: u64,
    /// Lifetime write-request count
    #[serde(default)]
    pub total_writes: u64,
    /// Requests admitted since midnight UTC
    #[serde(default)]
    pub requests_today: u64,
    /// Trust score 0-10000; tracked for future scoring, consumed nowhere
    #[serde(default = "default_reputation")]
    pub reputation: u32,
}

fn default_reputation() -> u32 {
    REPUTATION_INITIAL
}

/// Registration request for a new agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterAgentSpec {
    pub agent_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,
    #[serde(default = "default_max_authority")]
    pub max_authority: u8,
}

fn default_rate_limit() -> u32 {
    RATE_LIMIT_PER_HOUR_DEFAULT
}

fn default_max_authority() -> u8 {
    AGENT_AUTHORITY_DEFAULT
}

impl RegisterAgentSpec {
    /// Validate field shapes and ranges
    pub fn validate(&self) -> Result<()> {
        let id_len = self.agent_id.len();
        if !(AGENT_ID_LENGTH_CHARS_MIN..=AGENT_ID_LENGTH_CHARS_MAX).contains(&id_len) {
            return Err(Error::validation(format!(
                "agent_id length {id_len} outside {AGENT_ID_LENGTH_CHARS_MIN}-{AGENT_ID_LENGTH_CHARS_MAX}"
            )));
        }
        if !self
            .agent_id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(Error::validation(
                "agent_id may only contain [a-z0-9_-]",
            ));
        }
        if self.name.is_empty() || self.name.len() > AGENT_NAME_LENGTH_CHARS_MAX {
            return Err(Error::validation(format!(
                "name length must be 1-{AGENT_NAME_LENGTH_CHARS_MAX}"
            )));
        }
        if self.rate_limit == 0 || self.rate_limit > RATE_LIMIT_PER_HOUR_MAX {
            return Err(Error::validation(format!(
                "rate_limit must be 1-{RATE_LIMIT_PER_HOUR_MAX}"
            )));
        }
        if self.max_authority > AUTHORITY_MAX {
            return Err(Error::validation(format!(
                "max_authority must be 0-{AUTHORITY_MAX}"
            )));
        }
        Ok(())
    }

    /// Materialize the agent this spec describes, stamped at `now`
    pub fn into_agent(self, now: DateTime<Utc>) -> Agent {
        Agent {
            agent_id: self.agent_id,
            name: self.name,
            description: self.description,
            rate_limit: self.rate_limit,
            max_authority: self.max_authority,
            created_at: now,
            total_reads: 0,
            total_writes: 0,
            requests_today: 0,
            reputation: REPUTATION_INITIAL,
        }
    }
}
