//! System-wide limits and defaults
//!
//! Named constants with explicit units. Request validation, the rate
//! limiter, and the context assembler all read from here so the bounds
//! live in one place.

/// Maximum length of a search/context query in characters
pub const QUERY_LENGTH_CHARS_MAX: usize = 500;

/// Maximum length of memory content in characters
pub const CONTENT_LENGTH_CHARS_MAX: usize = 5_000;

/// Maximum number of tags on a single record
pub const TAGS_COUNT_MAX: usize = 20;

/// Maximum length of a rationale in characters
pub const RATIONALE_LENGTH_CHARS_MAX: usize = 500;

/// Maximum results returnable from a single search
pub const SEARCH_TOP_K_MAX: usize = 20;

/// Default number of search results
pub const SEARCH_TOP_K_DEFAULT: usize = 5;

/// Raw candidates fetched for context assembly before ranking
pub const CONTEXT_CANDIDATES_COUNT: usize = 10;

/// Over-fetch multiplier applied when a search filter is active
pub const FILTER_OVERFETCH_FACTOR: usize = 3;

/// Token budget bounds for context assembly
pub const CONTEXT_TOKENS_MIN: usize = 100;
pub const CONTEXT_TOKENS_MAX: usize = 8_000;
pub const CONTEXT_TOKENS_DEFAULT: usize = 2_000;

/// Approximate characters per token used for context budgeting
pub const CHARS_PER_TOKEN_ESTIMATE: usize = 4;

/// Sliding rate-limit window in seconds
pub const RATE_WINDOW_SECS: i64 = 3_600;

/// Default per-agent request quota per window
pub const RATE_LIMIT_PER_HOUR_DEFAULT: u32 = 100;

/// Upper bound on a configurable per-agent quota
pub const RATE_LIMIT_PER_HOUR_MAX: u32 = 10_000;

/// Highest authority level a memory type can carry
pub const AUTHORITY_MAX: u8 = 5;

/// Default write-authority ceiling for new agents
pub const AGENT_AUTHORITY_DEFAULT: u8 = 3;

/// Agent id length bounds in characters
pub const AGENT_ID_LENGTH_CHARS_MIN: usize = 1;
pub const AGENT_ID_LENGTH_CHARS_MAX: usize = 50;

/// Agent display-name length bound in characters
pub const AGENT_NAME_LENGTH_CHARS_MAX: usize = 100;

/// Initial reputation for a newly registered agent (0-10000 scale)
pub const REPUTATION_INITIAL: u32 = 5_000;

/// Debounce window between a write and the index rebuild it schedules
pub const REBUILD_DEBOUNCE_MS_DEFAULT: u64 = 2_000;

/// Maximum audit entries returnable from one query
pub const AUDIT_QUERY_LIMIT_MAX: usize = 1_000;

/// Default audit entries returned when no limit is given
pub const AUDIT_QUERY_LIMIT_DEFAULT: usize = 100;

/// Random bytes of key material behind each issued API key
pub const API_KEY_MATERIAL_BYTES: usize = 32;

/// Prefix on every issued API key
pub const API_KEY_PREFIX: &str = "smem_";
