//! Helpers for rule unit tests.

use crate::catalog::catalog;
use ktguard_core::{Config, Diagnostic, FileContext, KotlinParser, Mode, RuleFactory, RuleSet};
use std::sync::Arc;

pub struct Outcome {
    pub diagnostics: Vec<Diagnostic>,
    pub text: String,
}

impl Outcome {
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(|d| d.message.clone()).collect()
    }

    pub fn offsets(&self) -> Vec<usize> {
        self.diagnostics.iter().map(|d| d.offset).collect()
    }
}

pub fn run_with(factory: RuleFactory, config: &str, source: &str, mode: Mode) -> Outcome {
    let config = Config::parse(config).expect("test config must parse");
    let registry = Arc::new(catalog().expect("catalog must be valid"));
    let rule_set = RuleSet::build(registry, Arc::new(config.rules), &[factory]).expect("valid rule set");
    let file = FileContext::from_source(source);
    let processed = rule_set
        .process_source(&KotlinParser, &file, mode)
        .expect("source must process");
    Outcome {
        diagnostics: processed.diagnostics,
        text: processed.fixed_source.unwrap_or_else(|| source.to_string()),
    }
}

pub fn check(factory: RuleFactory, source: &str) -> Outcome {
    run_with(factory, "", source, Mode::Check)
}

pub fn fix(factory: RuleFactory, source: &str) -> Outcome {
    run_with(factory, "", source, Mode::Fix)
}

/// Fixes `source`, compares with `expected` and checks that a second pass
/// neither changes the text nor reports anything fixable.
pub fn assert_fixed(factory: RuleFactory, config: &str, source: &str, expected: &str) {
    let first = run_with(factory, config, source, Mode::Fix);
    assert_eq!(first.text, expected);
    let second = run_with(factory, config, &first.text, Mode::Fix);
    assert_eq!(second.text, first.text, "fix is not idempotent");
    assert!(
        second.diagnostics.iter().all(|d| !d.can_be_auto_corrected),
        "fixable diagnostics remain: {:?}",
        second.messages()
    );
}
