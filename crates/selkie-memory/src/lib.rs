//! Memory record model and append-only log for Selkie
//!
//! The write side of the substrate: typed, provenance-tagged records in a
//! durable, append-only sequence. Records are never edited or deleted;
//! corrections and upgrades are new records linked back to their originals.

pub mod log;
pub mod record;
pub mod types;

pub use log::{MemoryLog, RecordFilter};
pub use record::{MemoryRecord, Provenance, RecordDraft, SourceKind};
pub use types::{required_authority, MemoryType};
