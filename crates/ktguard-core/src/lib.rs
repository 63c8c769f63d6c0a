//! # ktguard-core
//!
//! Core engine for Kotlin style checking and formatting.
//!
//! Source text is parsed into a lossless [`SyntaxTree`]; an ordered
//! [`RuleSet`] of [`Rule`]s walks it, reports diagnostics and, in fix mode,
//! rewrites it in place. It includes:
//!
//! - [`SyntaxTree`] arena with stable [`NodeId`]s and checked mutation
//! - [`Rule`] trait and the [`RuleContext`] collector rules emit through
//! - [`WarningRegistry`] of declared warnings
//! - [`Config`] with per-warning options
//! - [`Baseline`] suppression of known violations
//! - [`Runner`] for processing batches of files in parallel
//!
//! ## Example
//!
//! ```ignore
//! use ktguard_core::{Mode, Runner};
//!
//! let runner = Runner::builder()
//!     .root("./app")
//!     .config(config)
//!     .registry(registry)
//!     .rules(&factories)
//!     .mode(Mode::Fix)
//!     .build()?;
//!
//! let result = runner.run(&[])?;
//! std::process::exit(result.exit_code());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod baseline;
mod config;
mod context;
mod kind;
mod listener;
mod pipeline;
mod rule;
mod runner;
mod tree;
mod types;
mod warnings;

/// Language front ends.
pub mod parser;

/// Utility modules for rule implementations.
pub mod utils;

pub use baseline::{file_key, Baseline, BaselineEntry, BaselineError, BaselineGenerator};
pub use config::{
    AnalyzerConfig, CommonConfig, Config, ConfigError, RuleConfig, RulesConfig,
};
pub use context::FileContext;
pub use kind::{Keyword, NodeKind};
pub use listener::{ListenerRef, ListenerSet, LoggingListener, ProcessorListener};
pub use parser::{KotlinParser, ParseError, SourceParser};
pub use pipeline::{ProcessError, Processed, RuleSet, RuleSetError};
pub use rule::{Diagnostic, Mode, Rule, RuleBox, RuleContext, RuleFactory};
pub use runner::{Runner, RunnerBuilder, RunnerError};
pub use tree::{Descendants, NodeId, SyntaxTree, TreeBuilder, TreeConsistencyError};
pub use types::{FailureKind, FileFailure, LintResult, Location, Severity, Violation};
pub use utils::allowance::AllowCheck;
pub use warnings::{RegistryError, Warning, WarningRegistry, COMMON};
