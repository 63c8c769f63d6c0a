//! # ktguard-rules
//!
//! Built-in Kotlin style rules for ktguard.
//!
//! ## Available Rules
//!
//! | Code | Rule | Warning | Fix |
//! |------|------|---------|-----|
//! | 3.1.1 | `file-size` | `FILE_IS_TOO_LONG` | no |
//! | 3.5.1 | `line-length` | `LONG_LINE` | no |
//! | 5.1.1 | `function-length` | `TOO_LONG_FUNCTION` | no |
//! | 3.2.1 | `braces-rule` | `NO_BRACES_IN_CONDITIONALS_AND_LOOPS` | yes |
//! | 3.4.1 | `empty-block-structure` | `EMPTY_BLOCK_STRUCTURE_ERROR` | yes |
//! | 3.15.1 | `consecutive-spaces` | `TOO_MANY_CONSECUTIVE_SPACES` | yes |
//! | 3.14.2 | `long-numerical-values` | `LONG_NUMERICAL_VALUES_SEPARATED` | yes |
//! | 3.3.1 | `indentation` | `WRONG_INDENTATION` | yes |
//!
//! ## Usage
//!
//! ```ignore
//! use ktguard_core::{Config, Runner};
//! use std::sync::Arc;
//! use ktguard_rules::{catalog, standard_rules, DEFAULT_CONFIG};
//!
//! let config = Config::parse(DEFAULT_CONFIG)?;
//! let runner = Runner::builder()
//!     .root("./src")
//!     .config(config)
//!     .registry(Arc::new(catalog()?))
//!     .rules(&standard_rules())
//!     .build()?;
//! let result = runner.run(&[])?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;

mod braces;
mod consecutive_spaces;
mod empty_block;
mod file_size;
mod function_length;
mod indentation;
mod line_length;
mod long_numbers;
mod presets;
mod utils;

#[cfg(test)]
mod test_support;

pub use braces::BracesInConditionalsAndLoops;
pub use catalog::{catalog, ALL_WARNINGS};
pub use consecutive_spaces::ConsecutiveSpaces;
pub use empty_block::EmptyBlock;
pub use file_size::FileSize;
pub use function_length::FunctionLength;
pub use indentation::Indentation;
pub use line_length::LineLength;
pub use long_numbers::LongNumericalValues;
pub use presets::{formatting_rules, metrics_rules, standard_rules, Preset};

/// Default configuration, also written by `ktguard init`.
pub const DEFAULT_CONFIG: &str = include_str!("../ktguard-analysis.toml");

/// Re-export core types for convenience.
pub use ktguard_core::{Rule, RuleFactory, Severity, Violation};
