//! Selkie core types
//!
//! Shared error taxonomy, configuration, and limits used by every
//! Selkie crate.

pub mod config;
pub mod constants;
pub mod error;

pub use config::SelkieConfig;
pub use error::{Error, Result};
