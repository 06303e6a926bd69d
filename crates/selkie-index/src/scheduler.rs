//! Debounced background index rebuilds
//!
//! Writes notify the scheduler; the scheduler coalesces bursts of writes
//! into a single rebuild that runs after a quiet window, off the request
//! path. State machine:
//!
//! ```text
//!   Idle --notify--> PendingDebounce --timer--> Building --done--> Idle
//!                        ^   |                    |
//!                        |   +-- notify: no-op    +-- notify: again=true,
//!                        |                            one more build after
//!                        +----------------------------this one finishes
//! ```
//!
//! Invariants: at most one build in flight; at least one build after the
//! last notify; a failed build leaves the previous snapshot active and is
//! never surfaced to the write that triggered it.

use crate::index::SemanticIndex;
use selkie_core::Result;
use selkie_memory::MemoryLog;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Rebuild state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RebuildState {
    /// Nothing scheduled
    Idle,
    /// A rebuild will start once the debounce window elapses
    PendingDebounce,
    /// A build is running; `again` queues one follow-up build
    Building { again: bool },
}

struct SchedulerInner {
    state: Mutex<RebuildState>,
    /// Serializes build execution, including admin-forced builds
    build_permit: tokio::sync::Mutex<()>,
    debounce: Duration,
    log: Arc<MemoryLog>,
    index: Arc<SemanticIndex>,
}

impl SchedulerInner {
    fn lock_state(&self) -> MutexGuard<'_, RebuildState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Schedules at most one background rebuild at a time
#[derive(Clone)]
pub struct RebuildScheduler {
    inner: Arc<SchedulerInner>,
}

impl RebuildScheduler {
    /// Create a scheduler over the given log and index
    pub fn new(log: Arc<MemoryLog>, index: Arc<SemanticIndex>, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                state: Mutex::new(RebuildState::Idle),
                build_permit: tokio::sync::Mutex::new(()),
                debounce,
                log,
                index,
            }),
        }
    }

    /// Signal that the log changed and the index should catch up
    ///
    /// Cheap and non-blocking; safe to call on every write.
    pub fn notify(&self) {
        let mut state = self.inner.lock_state();
        match *state {
            RebuildState::Idle => {
                *state = RebuildState::PendingDebounce;
                drop(state);
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    Self::run_debounced(inner).await;
                });
            }
            // coalesced: the pending rebuild covers this write too
            RebuildState::PendingDebounce => {}
            RebuildState::Building { .. } => {
                *state = RebuildState::Building { again: true };
            }
        }
    }

    /// Build immediately, bypassing the debounce window
    ///
    /// Still serialized with scheduled builds: waits for any in-flight
    /// build to finish first. Used by the admin force-rebuild endpoint.
    pub async fn rebuild_now(&self) -> Result<()> {
        let _permit = self.inner.build_permit.lock().await;
        Self::build_once(&self.inner).await
    }

    async fn run_debounced(inner: Arc<SchedulerInner>) {
        tokio::time::sleep(inner.debounce).await;

        {
            let mut state = inner.lock_state();
            if *state != RebuildState::PendingDebounce {
                return;
            }
            *state = RebuildState::Building { again: false };
        }

        loop {
            let result = {
                let _permit = inner.build_permit.lock().await;
                Self::build_once(&inner).await
            };

            // Failure keeps the previous snapshot active: stale but
            // available beats unavailable.
            if let Err(err) = result {
                tracing::warn!(error = %err, "index rebuild failed");
            }

            let mut state = inner.lock_state();
            if *state == (RebuildState::Building { again: true }) {
                *state = RebuildState::Building { again: false };
                continue;
            }
            *state = RebuildState::Idle;
            return;
        }
    }

    async fn build_once(inner: &SchedulerInner) -> Result<()> {
        let (records, log_len) = inner.log.records().await;
        let snapshot = inner.index.build(&records, log_len).await?;
        inner.index.install(Arc::new(snapshot));
        Ok(())
    }
}
