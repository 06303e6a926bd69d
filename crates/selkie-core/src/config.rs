//! Configuration for Selkie
//!
//! Explicit defaults, validation, reasonable limits.

use crate::constants::*;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable holding the admin key
pub const ADMIN_KEY_ENV: &str = "SELKIE_ADMIN_KEY";

/// Minimum admin key length in bytes
pub const ADMIN_KEY_LENGTH_BYTES_MIN: usize = 16;

/// Main configuration for a Selkie server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelkieConfig {
    /// Address to bind the HTTP listener
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Root directory for all persisted state
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Debounce window between a write and the rebuild it schedules
    #[serde(default = "default_debounce_ms")]
    pub rebuild_debounce_ms: u64,

    /// Admin key for the `/admin/*` tier; falls back to SELKIE_ADMIN_KEY
    #[serde(default)]
    pub admin_key: Option<String>,
}

fn default_bind_address() -> String {
    "127.0.0.1:7438".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("selkie-data")
}

fn default_debounce_ms() -> u64 {
    REBUILD_DEBOUNCE_MS_DEFAULT
}

impl Default for SelkieConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            data_dir: default_data_dir(),
            rebuild_debounce_ms: default_debounce_ms(),
            admin_key: None,
        }
    }
}

impl SelkieConfig {
    /// Resolve the admin key from config or environment
    pub fn resolve_admin_key(&self) -> Option<String> {
        self.admin_key
            .clone()
            .or_else(|| std::env::var(ADMIN_KEY_ENV).ok())
    }

    /// Path to the memory log document
    pub fn memory_path(&self) -> PathBuf {
        self.data_dir.join("memories.json")
    }

    /// Path to the persisted agent registry
    pub fn agents_path(&self) -> PathBuf {
        self.data_dir.join("agents.json")
    }

    /// Path to the append-only audit stream
    pub fn audit_path(&self) -> PathBuf {
        self.data_dir.join("logs").join("audit.jsonl")
    }

    /// Path to the persisted index snapshot
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("index").join("snapshot.json")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.bind_address.contains(':') {
            return Err(Error::Config {
                field: "bind_address".into(),
                reason: "must be in host:port format".into(),
            });
        }

        if self.rebuild_debounce_ms == 0 {
            return Err(Error::Config {
                field: "rebuild_debounce_ms".into(),
                reason: "must be non-zero".into(),
            });
        }

        if let Some(key) = &self.admin_key {
            if key.len() < ADMIN_KEY_LENGTH_BYTES_MIN {
                return Err(Error::Config {
                    field: "admin_key".into(),
                    reason: format!(
                        "too short: {} < {} bytes",
                        key.len(),
                        ADMIN_KEY_LENGTH_BYTES_MIN
                    ),
                });
            }
        }

        Ok(())
    }
}
