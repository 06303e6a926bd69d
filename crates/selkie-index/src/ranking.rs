//! Authority-weighted ranking and context assembly
//!
//! Raw similarity hits from the index are filtered, re-ranked so that
//! authority dominates similarity, and packed greedily into a
//! character-budgeted block for LLM prompt injection.

use crate::snapshot::ScoredEntry;
use selkie_core::constants::{CHARS_PER_TOKEN_ESTIMATE, FILTER_OVERFETCH_FACTOR};
use selkie_memory::MemoryType;
use std::cmp::Reverse;

/// Opening tag of an assembled context block
pub const CONTEXT_BLOCK_OPEN: &str = "<relevant_memories>";

/// Closing tag of an assembled context block
pub const CONTEXT_BLOCK_CLOSE: &str = "</relevant_memories>";

/// Raw candidates to request from the index for a final `top_k`
///
/// Filters drop candidates after retrieval, so a filtered search
/// over-fetches to keep the final result set full.
pub fn raw_candidates(top_k: usize, filtered: bool) -> usize {
    if filtered {
        top_k * FILTER_OVERFETCH_FACTOR
    } else {
        top_k
    }
}

/// Drop candidates failing the caller's kind/min-authority filters and
/// truncate to `top_k`
pub fn filter_candidates(
    candidates: Vec<ScoredEntry>,
    kind: Option<MemoryType>,
    min_authority: u8,
    top_k: usize,
) -> Vec<ScoredEntry> {
    candidates
        .into_iter()
        .filter(|hit| kind.map_or(true, |k| hit.entry.kind == k))
        .filter(|hit| hit.entry.authority >= min_authority)
        .take(top_k)
        .collect()
}

/// Order hits by descending authority, similarity breaking ties
///
/// Authority dominates: a constraint with a mediocre score always
/// precedes a hypothesis with a perfect one.
pub fn rank(hits: &mut [ScoredEntry]) {
    hits.sort_by(|a, b| {
        Reverse(a.entry.authority)
            .cmp(&Reverse(b.entry.authority))
            .then(
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
}

/// Format one hit as a context line
fn format_entry(hit: &ScoredEntry) -> String {
    format!(
        "[{}|auth:{}|score:{:.2}] {}",
        hit.entry.kind, hit.entry.authority, hit.score, hit.entry.content
    )
}

/// Assemble ranked hits into a token-budgeted context block
///
/// Budget is `max_tokens * 4` characters (a chars-per-token estimate),
/// counted over entry text. Entries are appended greedily in rank order;
/// the first entry that would overflow is dropped whole, never truncated
/// mid-string. No candidates at all yields the empty-string sentinel.
pub fn assemble_context(hits: &[ScoredEntry], max_tokens: usize) -> String {
    if hits.is_empty() {
        return String::new();
    }

    let mut ranked: Vec<ScoredEntry> = hits.to_vec();
    rank(&mut ranked);

    let budget_chars = max_tokens * CHARS_PER_TOKEN_ESTIMATE;
    let mut lines = vec![CONTEXT_BLOCK_OPEN.to_string()];
    let mut total_chars = 0;

    for hit in &ranked {
        let entry = format_entry(hit);
        if total_chars + entry.len() > budget_chars {
            break;
        }
        total_chars += entry.len();
        lines.push(entry);
    }

    lines.push(CONTEXT_BLOCK_CLOSE.to_string());
    lines.join("\n")
}
