//! Admission control for the two trust tiers

pub mod auth;

pub use auth::{admit, require_admin};
