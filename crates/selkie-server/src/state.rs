//! Shared server state
//!
//! Wires the memory log, semantic index, rebuild scheduler, agent
//! registry, and audit trail together behind one cloneable handle.

use selkie_core::{Result, SelkieConfig};
use selkie_index::{Embedder, HashEmbedder, RebuildScheduler, SemanticIndex};
use selkie_memory::MemoryLog;
use selkie_registry::{AgentRegistry, AuditLog};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Server-wide shared state
#[derive(Clone)]
pub struct AppState {
    pub log: Arc<MemoryLog>,
    pub index: Arc<SemanticIndex>,
    pub scheduler: RebuildScheduler,
    pub registry: Arc<AgentRegistry>,
    pub audit: Arc<AuditLog>,
    admin_key: Option<String>,
    start_time: Instant,
}

impl AppState {
    /// Build the full state from configuration with the default embedder
    pub fn open(config: &SelkieConfig) -> Result<Self> {
        Self::open_with_embedder(config, Arc::new(HashEmbedder::default()))
    }

    /// Build the full state with a caller-supplied embedder
    pub fn open_with_embedder(
        config: &SelkieConfig,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        config.validate()?;

        let log = Arc::new(MemoryLog::open(config.memory_path())?);
        let registry = Arc::new(AgentRegistry::open(config.agents_path())?);
        let audit = Arc::new(AuditLog::open(config.audit_path())?);
        let index = Arc::new(SemanticIndex::with_persistence(
            embedder,
            config.snapshot_path(),
        ));
        let scheduler = RebuildScheduler::new(
            Arc::clone(&log),
            Arc::clone(&index),
            Duration::from_millis(config.rebuild_debounce_ms),
        );

        Ok(Self {
            log,
            index,
            scheduler,
            registry,
            audit,
            admin_key: config.resolve_admin_key(),
            start_time: Instant::now(),
        })
    }

    /// Restore the persisted snapshot and schedule a rebuild if the log
    /// has moved past it (or no snapshot exists for a non-empty log)
    pub async fn restore_index(&self) -> Result<()> {
        let restored = self.index.load_persisted()?;
        let log_len = self.log.len().await;

        let stale = match (restored, log_len) {
            (_, 0) => false,
            (false, _) => true,
            (true, n) => self.index.status().log_len != n,
        };
        if stale {
            tracing::info!(log_len, "index behind log, scheduling rebuild");
            self.scheduler.notify();
        }
        Ok(())
    }

    /// Configured admin key, when the admin tier is enabled
    pub fn admin_key(&self) -> Option<&str> {
        self.admin_key.as_deref()
    }

    /// Server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
