//! Tailoring rule descriptions.
//!
//! Rules arrive pre-parsed from the locale definition front end; this module
//! only defines their in-memory shape. Absolute rules assign weight ranges
//! directly, relative rules reposition keys next to an anchor.

use crate::types::Codepoint;

/// Placement direction of a relative rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The tailored key sorts immediately after the reference.
    After,
    /// The tailored key sorts immediately before the reference.
    Before,
}

impl Direction {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::After => "after",
            Self::Before => "before",
        }
    }
}

/// Weight level targeted by a relative rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleLevel {
    /// Clone the reference's element list verbatim.
    Identity,
    /// Adjust primary weights.
    Primary,
    /// Adjust secondary weights.
    Secondary,
    /// Adjust tertiary weights.
    Tertiary,
    /// Adjust quaternary weights.
    Quaternary,
}

impl RuleLevel {
    /// Number of levels matched during collision avoidance; the target
    /// level is the last of them. `None` for identity rules.
    #[must_use]
    pub const fn depth(self) -> Option<usize> {
        match self {
            Self::Identity => None,
            Self::Primary => Some(1),
            Self::Secondary => Some(2),
            Self::Tertiary => Some(3),
            Self::Quaternary => Some(4),
        }
    }
}

/// A named anchor position resolved against the loaded table rather than a
/// literal character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalPosition {
    /// First codepoint with variable weights.
    FirstVariable,
    /// Last codepoint with variable weights.
    LastVariable,
    /// First codepoint ignorable at the primary level.
    FirstPrimaryIgnorable,
    /// Last codepoint ignorable at the primary level.
    LastPrimaryIgnorable,
    /// First codepoint ignorable at the secondary level.
    FirstSecondaryIgnorable,
    /// Last codepoint ignorable at the secondary level.
    LastSecondaryIgnorable,
    /// First codepoint ignorable at the tertiary level.
    FirstTertiaryIgnorable,
    /// Last codepoint ignorable at the tertiary level.
    LastTertiaryIgnorable,
    /// First codepoint not ignorable at any level.
    FirstNonIgnorable,
    /// Last codepoint not ignorable at any level.
    LastNonIgnorable,
    /// First codepoint in the trailing region.
    FirstTrailing,
    /// Last codepoint in the trailing region.
    LastTrailing,
}

impl LogicalPosition {
    /// All positions, in slot order.
    pub const ALL: [Self; 12] = [
        Self::FirstVariable,
        Self::LastVariable,
        Self::FirstPrimaryIgnorable,
        Self::LastPrimaryIgnorable,
        Self::FirstSecondaryIgnorable,
        Self::LastSecondaryIgnorable,
        Self::FirstTertiaryIgnorable,
        Self::LastTertiaryIgnorable,
        Self::FirstNonIgnorable,
        Self::LastNonIgnorable,
        Self::FirstTrailing,
        Self::LastTrailing,
    ];

    pub(crate) const fn slot(self) -> usize {
        match self {
            Self::FirstVariable => 0,
            Self::LastVariable => 1,
            Self::FirstPrimaryIgnorable => 2,
            Self::LastPrimaryIgnorable => 3,
            Self::FirstSecondaryIgnorable => 4,
            Self::LastSecondaryIgnorable => 5,
            Self::FirstTertiaryIgnorable => 6,
            Self::LastTertiaryIgnorable => 7,
            Self::FirstNonIgnorable => 8,
            Self::LastNonIgnorable => 9,
            Self::FirstTrailing => 10,
            Self::LastTrailing => 11,
        }
    }
}

/// Anchor of a relative rule: a literal character sequence or a logical
/// position of the loaded table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleAnchor {
    /// A literal one-or-more-codepoint sequence.
    Text(String),
    /// A table-derived position.
    Position(LogicalPosition),
}

/// A relative tailoring rule: place `target` after/before `reference`,
/// adjusting weights at `level`.
#[derive(Debug, Clone)]
pub struct TailoringRule {
    /// The key the rule chain is defined relative to.
    pub anchor: RuleAnchor,
    /// The previously tailored key (the anchor itself on the first rule
    /// after a reset).
    pub reference: String,
    /// The character sequence being tailored.
    pub target: String,
    /// Placement direction.
    pub direction: Direction,
    /// Targeted weight level.
    pub level: RuleLevel,
    /// Tailor each character of `target` separately, chaining
    /// reference to the previous character so they sort in declaration
    /// order.
    pub expand_multiple: bool,
}

/// An absolute tailoring rule: assign explicit weights to a codepoint
/// range, advancing by `step` per codepoint.
#[derive(Debug, Clone)]
pub struct AbsoluteRule {
    /// First codepoint of the range.
    pub start: Codepoint,
    /// Last codepoint of the range (inclusive).
    pub end: Codepoint,
    /// Starting weights in bracketed text form.
    pub start_weight: String,
    /// Per-codepoint increment in bracketed text form; empty selects the
    /// default step of one primary unit.
    pub step: String,
}
