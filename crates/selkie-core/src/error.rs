//! Error types for Selkie
//!
//! Explicit error variants with context, using thiserror. One taxonomy is
//! shared by every crate: the gateway maps each variant onto an HTTP status,
//! so domain code never reasons about status codes directly.

use thiserror::Error;

/// Result type alias for Selkie operations
pub type Result<T> = std::result::Result<T, Error>;

/// Selkie error types
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Request Errors
    // =========================================================================
    /// Malformed or out-of-range input, rejected before any mutation
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// Missing or unrecognized API key
    #[error("authentication failed: {reason}")]
    Auth { reason: String },

    /// Sliding-window quota exhausted; the request is rejected, not queued
    #[error("rate limit exceeded ({limit}/hour)")]
    RateLimit { limit: u32 },

    /// Write type requires more authority than the agent's ceiling
    #[error("agent limited to authority {ceiling}, but {memory_type} requires {required}")]
    Authority {
        memory_type: String,
        required: u8,
        ceiling: u8,
    },

    /// Unknown agent, record, or route
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// Duplicate identifier on registration
    #[error("{resource} already exists: {id}")]
    Conflict { resource: &'static str, id: String },

    // =========================================================================
    // Index Errors
    // =========================================================================
    /// No snapshot has ever been built; callers must trigger a build
    #[error("semantic index unavailable: no snapshot built yet")]
    IndexUnavailable,

    /// Embedding or nearest-neighbor backend failure, retryable
    #[error("upstream embedding failure: {reason}")]
    Upstream { reason: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Invalid configuration value
    #[error("invalid configuration: {field}: {reason}")]
    Config { field: String, reason: String },

    /// Filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Machine-readable error code for wire responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::Auth { .. } => "auth_error",
            Self::RateLimit { .. } => "rate_limit_exceeded",
            Self::Authority { .. } => "authority_exceeded",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::IndexUnavailable => "index_unavailable",
            Self::Upstream { .. } => "upstream_error",
            Self::Config { .. } => "config_error",
            Self::Io(_) => "io_error",
            Self::Serialization(_) => "serialization_error",
        }
    }

    /// Shorthand for a validation failure
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Shorthand for an authentication failure
    pub fn auth(reason: impl Into<String>) -> Self {
        Self::Auth {
            reason: reason.into(),
        }
    }

    /// Shorthand for a missing resource
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Shorthand for a duplicate resource
    pub fn conflict(resource: &'static str, id: impl Into<String>) -> Self {
        Self::Conflict {
            resource,
            id: id.into(),
        }
    }

    /// Shorthand for an embedding backend failure
    pub fn upstream(reason: impl Into<String>) -> Self {
        Self::Upstream {
            reason: reason.into(),
        }
    }
}
