//! Memory type system
//!
//! Eight record kinds, each with a fixed authority level and per-type
//! required-field rules, held in a static metadata table rather than
//! string matching scattered through the code.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-type metadata: authority and required-field flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMetadata {
    /// Trust level 0-5; higher authority outranks higher similarity
    pub authority: u8,
    /// Whether a record of this type must carry a rationale
    pub requires_rationale: bool,
    /// Whether a record of this type must carry a confidence score
    pub requires_confidence: bool,
    /// Whether records of this type are expected to expire
    pub may_expire: bool,
}

/// Kind of a memory record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// Untested ideas
    Hypothesis,
    /// Noticed patterns
    Observation,
    /// User/agent preferences
    Preference,
    /// Learned from experience
    Lesson,
    /// Objectives, targets
    Goal,
    /// How to do things, steps
    Procedure,
    /// Choices made with rationale
    Decision,
    /// Hard rules, must-follow guidelines
    Constraint,
}

impl MemoryType {
    /// All kinds, in ascending authority order
    pub const ALL: [MemoryType; 8] = [
        Self::Hypothesis,
        Self::Observation,
        Self::Preference,
        Self::Lesson,
        Self::Goal,
        Self::Procedure,
        Self::Decision,
        Self::Constraint,
    ];

    /// Static metadata for this kind
    pub const fn metadata(self) -> TypeMetadata {
        match self {
            Self::Hypothesis => TypeMetadata {
                authority: 0,
                requires_rationale: false,
                requires_confidence: true,
                may_expire: true,
            },
            Self::Observation => TypeMetadata {
                authority: 1,
                requires_rationale: false,
                requires_confidence: false,
                may_expire: true,
            },
            Self::Preference => TypeMetadata {
                authority: 1,
                requires_rationale: false,
                requires_confidence: false,
                may_expire: false,
            },
            Self::Lesson => TypeMetadata {
                authority: 3,
                requires_rationale: false,
                requires_confidence: true,
                may_expire: false,
            },
            Self::Goal => TypeMetadata {
                authority: 3,
                requires_rationale: false,
                requires_confidence: false,
                may_expire: true,
            },
            Self::Procedure => TypeMetadata {
                authority: 4,
                requires_rationale: false,
                requires_confidence: false,
                may_expire: false,
            },
            Self::Decision => TypeMetadata {
                authority: 4,
                requires_rationale: true,
                requires_confidence: false,
                may_expire: false,
            },
            Self::Constraint => TypeMetadata {
                authority: 5,
                requires_rationale: true,
                requires_confidence: false,
                may_expire: false,
            },
        }
    }

    /// Authority level 0-5 for this kind
    pub const fn authority(self) -> u8 {
        self.metadata().authority
    }

    /// Wire name of this kind
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hypothesis => "hypothesis",
            Self::Observation => "observation",
            Self::Preference => "preference",
            Self::Lesson => "lesson",
            Self::Goal => "goal",
            Self::Procedure => "procedure",
            Self::Decision => "decision",
            Self::Constraint => "constraint",
        }
    }

    /// Human description, shown by the public types endpoint
    pub const fn description(self) -> &'static str {
        match self {
            Self::Hypothesis => "Untested ideas",
            Self::Observation => "Noticed patterns",
            Self::Preference => "User/agent preferences",
            Self::Lesson => "Learned from experience",
            Self::Goal => "Objectives, targets",
            Self::Procedure => "How to do things, steps",
            Self::Decision => "Choices made with rationale",
            Self::Constraint => "Hard rules, must-follow guidelines",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

/// Authority required to write a record of the named type
///
/// Total over all inputs: unknown names map to 0.
pub fn required_authority(name: &str) -> u8 {
    name.parse::<MemoryType>()
        .map(MemoryType::authority)
        .unwrap_or(0)
}
