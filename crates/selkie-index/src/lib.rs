//! Semantic read path for Selkie
//!
//! Embeds memory records, serves top-k similarity queries against an
//! immutable snapshot, keeps the snapshot eventually consistent with the
//! log through a debounced background rebuild, and assembles
//! authority-ranked context blocks for LLM injection.

pub mod embedder;
pub mod index;
pub mod ranking;
pub mod scheduler;
pub mod snapshot;

pub use embedder::{Embedder, EmbedderConfig, HashEmbedder};
pub use index::{IndexStatus, SemanticIndex};
pub use ranking::{assemble_context, filter_candidates, rank, raw_candidates};
pub use scheduler::RebuildScheduler;
pub use snapshot::{IndexEntry, IndexSnapshot, ScoredEntry};
