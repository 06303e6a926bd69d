//! Selkie gateway
//!
//! HTTP surface of the memory substrate: admission control in front of
//! the memory log, semantic index, and audit trail, exposed as two trust
//! tiers (`/v1/*` for agents, `/admin/*` for the operator).

pub mod api;
pub mod models;
pub mod security;
pub mod state;

pub use state::AppState;
