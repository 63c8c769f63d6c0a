//! Ordered rule lists.

use crate::{
    braces, consecutive_spaces, empty_block, file_size, function_length, indentation, line_length,
    long_numbers,
};
use ktguard_core::RuleFactory;

/// Named subsets of the standard pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Every rule.
    Standard,
    /// Rules that rewrite code.
    Formatting,
    /// Size limits only, never changing code.
    Metrics,
}

impl Preset {
    /// Every preset, in listing order.
    pub const ALL: [Self; 3] = [Self::Standard, Self::Formatting, Self::Metrics];

    /// The name used in configuration and on the command line.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Formatting => "formatting",
            Self::Metrics => "metrics",
        }
    }

    /// One-line summary for `list-rules`.
    #[must_use]
    pub fn summary(self) -> &'static str {
        match self {
            Self::Standard => "every rule (default)",
            Self::Formatting => "rules that rewrite code",
            Self::Metrics => "file, line and function size limits, never changing code",
        }
    }

    /// Returns the rule factories of this preset, in pipeline order.
    #[must_use]
    pub fn rules(self) -> Vec<RuleFactory> {
        match self {
            Self::Standard => standard_rules(),
            Self::Formatting => formatting_rules(),
            Self::Metrics => metrics_rules(),
        }
    }

    /// Looks a preset up by its lowercase name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.name() == name)
    }
}

/// The standard pipeline.
///
/// Read-only rules come first so their findings don't depend on the fixes
/// of later rules. `indentation` is last.
#[must_use]
pub fn standard_rules() -> Vec<RuleFactory> {
    vec![
        file_size::FileSize::boxed,
        line_length::LineLength::boxed,
        function_length::FunctionLength::boxed,
        braces::BracesInConditionalsAndLoops::boxed,
        empty_block::EmptyBlock::boxed,
        consecutive_spaces::ConsecutiveSpaces::boxed,
        long_numbers::LongNumericalValues::boxed,
        indentation::Indentation::boxed,
    ]
}

/// Rules with auto-correction.
///
/// Includes:
/// - `braces-rule` (3.2.1)
/// - `empty-block-structure` (3.4.1)
/// - `consecutive-spaces` (3.15.1)
/// - `long-numerical-values` (3.14.2)
/// - `indentation` (3.3.1)
#[must_use]
pub fn formatting_rules() -> Vec<RuleFactory> {
    vec![
        braces::BracesInConditionalsAndLoops::boxed,
        empty_block::EmptyBlock::boxed,
        consecutive_spaces::ConsecutiveSpaces::boxed,
        long_numbers::LongNumericalValues::boxed,
        indentation::Indentation::boxed,
    ]
}

/// `file-size`, `line-length` and `function-length`.
#[must_use]
pub fn metrics_rules() -> Vec<RuleFactory> {
    vec![
        file_size::FileSize::boxed,
        line_length::LineLength::boxed,
        function_length::FunctionLength::boxed,
    ]
}
