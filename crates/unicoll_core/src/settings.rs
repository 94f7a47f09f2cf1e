//! Per-locale collation settings.

use crate::element::CompareOptions;
use crate::types::{Codepoint, MAX_CODEPOINT};

/// Deepest weight level at which two strings are distinguished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Strength {
    /// Base characters only.
    Primary,
    /// Base characters and accents.
    Secondary,
    /// Base characters, accents and case.
    Tertiary,
    /// All four weight levels.
    #[default]
    Quaternary,
    /// Codepoint identity beyond all weights.
    Identity,
}

impl Strength {
    /// Number of weight levels the strength compares.
    #[must_use]
    pub const fn level_count(self) -> usize {
        match self {
            Self::Primary => 1,
            Self::Secondary => 2,
            Self::Tertiary => 3,
            Self::Quaternary | Self::Identity => 4,
        }
    }

    pub(crate) const fn as_byte(self) -> u8 {
        match self {
            Self::Primary => 1,
            Self::Secondary => 2,
            Self::Tertiary => 3,
            Self::Quaternary => 4,
            Self::Identity => 5,
        }
    }
}

/// Whether one case variant sorts ahead of the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseFirst {
    /// Case ordering follows the tertiary weights as-is.
    #[default]
    Off,
    /// Upper case sorts first (tertiary comparisons reversed).
    Upper,
    /// Lower case sorts first.
    Lower,
}

impl CaseFirst {
    pub(crate) const fn as_byte(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Upper => 1,
            Self::Lower => 2,
        }
    }
}

/// Contraction intake policy flags.
///
/// Contractions can enter a collation from the DUCET itself and from
/// tailoring rules; either source can be enabled independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContractionPolicy(u8);

impl ContractionPolicy {
    /// No contractions are collected.
    pub const IGNORE_ALL: Self = Self(0);
    /// Multi-codepoint DUCET entries become contractions.
    pub const FROM_DUCET: Self = Self(0x01);
    /// Tailoring rules may introduce contractions.
    pub const FROM_TAILORING: Self = Self(0x02);
    /// Both sources enabled.
    pub const FULL: Self = Self(0x03);

    /// Creates a policy from its raw bits.
    #[must_use]
    pub const fn from_byte(b: u8) -> Self {
        Self(b & 0x03)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self.0
    }

    /// Checks whether DUCET contractions are collected.
    #[must_use]
    pub const fn uses_ducet(self) -> bool {
        self.0 & 0x01 != 0
    }

    /// Checks whether tailoring contractions are collected.
    #[must_use]
    pub const fn uses_tailoring(self) -> bool {
        self.0 & 0x02 != 0
    }
}

/// Settings for compiling one locale's collation.
#[derive(Debug, Clone)]
pub struct CollationSettings {
    /// Comparison strength.
    pub strength: Strength,
    /// Compare the secondary level in reverse scan order.
    pub backwards: bool,
    /// Treat case as a separate comparison level.
    pub case_level: bool,
    /// Case ordering preference.
    pub case_first: CaseFirst,
    /// Enable multi-element expansions in the optimized output.
    pub expansions: bool,
    /// Contraction intake policy.
    pub contractions: ContractionPolicy,
    /// Exclusive upper bound of codepoints tracked for this locale.
    pub max_codepoint: Codepoint,
}

impl Default for CollationSettings {
    fn default() -> Self {
        Self {
            strength: Strength::default(),
            backwards: false,
            case_level: false,
            case_first: CaseFirst::default(),
            expansions: false,
            contractions: ContractionPolicy::IGNORE_ALL,
            max_codepoint: MAX_CODEPOINT + 1,
        }
    }
}

impl CollationSettings {
    /// Creates settings with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the comparison strength.
    #[must_use]
    pub const fn strength(mut self, value: Strength) -> Self {
        self.strength = value;
        self
    }

    /// Sets reversed secondary comparison.
    #[must_use]
    pub const fn backwards(mut self, value: bool) -> Self {
        self.backwards = value;
        self
    }

    /// Sets the case level flag.
    #[must_use]
    pub const fn case_level(mut self, value: bool) -> Self {
        self.case_level = value;
        self
    }

    /// Sets the case ordering preference.
    #[must_use]
    pub const fn case_first(mut self, value: CaseFirst) -> Self {
        self.case_first = value;
        self
    }

    /// Enables or disables expansions.
    #[must_use]
    pub const fn expansions(mut self, value: bool) -> Self {
        self.expansions = value;
        self
    }

    /// Sets the contraction intake policy.
    #[must_use]
    pub const fn contractions(mut self, value: ContractionPolicy) -> Self {
        self.contractions = value;
        self
    }

    /// Sets the locale's maximum tracked codepoint (exclusive).
    #[must_use]
    pub const fn max_codepoint(mut self, value: Codepoint) -> Self {
        self.max_codepoint = value;
        self
    }

    /// Comparison options for the configured strength.
    #[must_use]
    pub fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            strength: self.strength,
            backwards: self.backwards,
            case_level: self.case_level,
            case_first: self.case_first,
            use_only_first_ce: false,
        }
    }
}
