//! Error types for the collation compiler.

use std::io;
use thiserror::Error;

/// Result type for collation compilation.
pub type CollationResult<T> = Result<T, CollationError>;

/// Errors that can occur while compiling a collation.
#[derive(Debug, Error)]
pub enum CollationError {
    /// I/O error while reading a data file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Structurally invalid input that cannot be skipped.
    #[error("parse error: {message}")]
    Parse {
        /// Description of the malformed element.
        message: String,
    },

    /// A tailoring rule could not be applied.
    #[error("rule {index}: {message}")]
    InvalidRule {
        /// Ordinal index of the failing rule in its rule list.
        index: usize,
        /// Description of the failure.
        message: String,
    },

    /// A codepoint exceeds the configured maximum for the locale.
    #[error("codepoint U+{codepoint:04X} exceeds maximum {max:#06X}")]
    CodepointOutOfRange {
        /// The offending codepoint.
        codepoint: u32,
        /// The locale's configured maximum (exclusive).
        max: u32,
    },

    /// An accumulated weight left the representable range.
    #[error("weight overflow: {message}")]
    WeightOverflow {
        /// Description of the overflowing range or step.
        message: String,
    },

    /// Collision avoidance grew a collation element list past its capacity.
    #[error("collation element list overflow while applying {direction}-rule")]
    CeListOverflow {
        /// Direction of the rule being applied.
        direction: &'static str,
    },

    /// A before-rule decremented through every collation element.
    #[error("collation element list underflow while applying before-rule")]
    CeListUnderflow,

    /// A weight level uses more distinct values than its encoding allows.
    #[error("weight encoding budget exceeded: level {level} uses weight {weight:#06X}, limit {limit:#06X}")]
    WeightLimitExceeded {
        /// The weight level (1-based).
        level: usize,
        /// The largest weight value in use on that level.
        weight: u16,
        /// The largest encodable value for that level.
        limit: u16,
    },

    /// A pipeline invariant was broken; indicates a compiler bug.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the broken invariant.
        message: String,
    },
}

impl CollationError {
    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates an invalid rule error.
    pub fn invalid_rule(index: usize, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            index,
            message: message.into(),
        }
    }

    /// Creates a weight overflow error.
    pub fn weight_overflow(message: impl Into<String>) -> Self {
        Self::WeightOverflow {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = CollationError::invalid_rule(7, "anchor not found");
        assert_eq!(err.to_string(), "rule 7: anchor not found");

        let err = CollationError::CodepointOutOfRange {
            codepoint: 0x1F600,
            max: 0x10000,
        };
        assert!(err.to_string().contains("U+1F600"));
    }
}
