//! Admission control for Selkie
//!
//! Agent identity, API-key issuance and verification, sliding-window rate
//! limiting, write-authority ceilings, and the append-only audit trail.
//! Together these gate every request before it reaches the memory log or
//! the semantic index.

pub mod agent;
pub mod audit;
pub mod registry;

pub use agent::{Agent, RegisterAgentSpec};
pub use audit::{AuditEntry, AuditLog, ADMIN_ACTOR};
pub use registry::AgentRegistry;
