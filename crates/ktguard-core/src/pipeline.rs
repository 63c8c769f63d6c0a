//! Ordered rule pipeline.
//!
//! A [`RuleSet`] is built once per run. Every rule runs once per file, in
//! the declared order, on the same tree: later rules see the fixes of
//! earlier ones. Declared `runs_after` constraints are checked at
//! construction.

use crate::config::{CommonConfig, RulesConfig};
use crate::context::FileContext;
use crate::parser::{ParseError, SourceParser};
use crate::rule::{Diagnostic, Mode, RuleBox, RuleContext, RuleFactory};
use crate::tree::{SyntaxTree, TreeConsistencyError};
use crate::warnings::WarningRegistry;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors detected while assembling a [`RuleSet`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleSetError {
    /// A rule declares a warning that is missing from the catalog.
    #[error("rule `{rule}` raises `{warning}`, which is not in the warning catalog")]
    UnregisteredWarning {
        /// Rule name.
        rule: &'static str,
        /// Warning name.
        warning: &'static str,
    },

    /// A `runs_after` dependency is placed after its dependent.
    #[error("rule `{rule}` must run after `{dependency}`, but is ordered before it")]
    Ordering {
        /// Rule declaring the constraint.
        rule: &'static str,
        /// Rule it must follow.
        dependency: &'static str,
    },

    /// Two rules share a name.
    #[error("rule `{0}` is registered more than once")]
    DuplicateRule(&'static str),
}

/// Failure to process one source text.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The text could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A rule performed an invalid tree mutation.
    #[error("rule `{rule}` corrupted the syntax tree: {source}")]
    Tree {
        /// Offending rule.
        rule: &'static str,
        /// Underlying error.
        source: TreeConsistencyError,
    },
}

/// Result of running the pipeline on one source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    /// Diagnostics in emission order.
    pub diagnostics: Vec<Diagnostic>,
    /// New text, when fix mode changed it.
    pub fixed_source: Option<String>,
}

/// Ordered, validated list of rules with their configuration.
pub struct RuleSet {
    rules: Vec<RuleBox>,
    registry: Arc<WarningRegistry>,
    config: Arc<RulesConfig>,
    common: CommonConfig,
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("rules", &self.names())
            .finish_non_exhaustive()
    }
}

impl RuleSet {
    /// Instantiates every factory with `config` and validates the result.
    ///
    /// # Errors
    ///
    /// See [`RuleSet::from_rules`].
    pub fn build(
        registry: Arc<WarningRegistry>,
        config: Arc<RulesConfig>,
        factories: &[RuleFactory],
    ) -> Result<Self, RuleSetError> {
        let rules = factories.iter().map(|factory| factory(&config)).collect();
        Self::from_rules(registry, config, rules)
    }

    /// Validates already created rules.
    ///
    /// # Errors
    ///
    /// Returns [`RuleSetError`] for duplicate rules, unregistered warnings or
    /// violated ordering constraints.
    pub fn from_rules(
        registry: Arc<WarningRegistry>,
        config: Arc<RulesConfig>,
        rules: Vec<RuleBox>,
    ) -> Result<Self, RuleSetError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.name()) {
                return Err(RuleSetError::DuplicateRule(rule.name()));
            }
            if let Some(warning) = rule
                .warnings()
                .iter()
                .find(|w| !registry.contains(w.name))
            {
                return Err(RuleSetError::UnregisteredWarning {
                    rule: rule.name(),
                    warning: warning.name,
                });
            }
        }
        check_order(&rules)?;

        let common = config.common();
        Ok(Self {
            rules,
            registry,
            config,
            common,
        })
    }

    /// Rule names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Rules in execution order.
    pub fn rules(&self) -> impl Iterator<Item = &RuleBox> {
        self.rules.iter()
    }

    /// The warning catalog.
    #[must_use]
    pub fn registry(&self) -> &WarningRegistry {
        &self.registry
    }

    /// The active rule configuration.
    #[must_use]
    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    /// Cross-rule settings.
    #[must_use]
    pub fn common(&self) -> &CommonConfig {
        &self.common
    }

    /// Returns `true` if at least one warning of the rule is enabled.
    fn is_active(&self, rule: &RuleBox) -> bool {
        rule.warnings().iter().any(|w| self.config.is_enabled(w.name))
    }

    /// Runs every active rule once, in order, on `tree`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Tree`] if a rule performs an invalid mutation.
    pub fn execute(
        &self,
        tree: &mut SyntaxTree,
        file: &FileContext<'_>,
        mode: Mode,
    ) -> Result<Vec<Diagnostic>, ProcessError> {
        let mut diagnostics = Vec::new();
        for rule in &self.rules {
            if !self.is_active(rule) {
                debug!("Skipping disabled rule: {}", rule.name());
                continue;
            }
            let mut ctx = RuleContext::new(file, &self.config, mode);
            rule.visit(tree, &mut ctx)
                .map_err(|source| ProcessError::Tree {
                    rule: rule.name(),
                    source,
                })?;
            let emitted = ctx.into_diagnostics();
            debug!(
                "{}: {} reported {} diagnostic(s)",
                file.display_path(),
                rule.name(),
                emitted.len()
            );
            diagnostics.extend(emitted);
        }
        Ok(diagnostics)
    }

    /// Parses `file.content`, runs the pipeline and, in fix mode, returns the
    /// new text if it differs from the original.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] on parse failure or invalid mutation.
    pub fn process_source(
        &self,
        parser: &dyn SourceParser,
        file: &FileContext<'_>,
        mode: Mode,
    ) -> Result<Processed, ProcessError> {
        let mut tree = parser.parse(file.content)?;
        let diagnostics = self.execute(&mut tree, file, mode)?;
        let fixed_source = match mode {
            Mode::Fix => Some(tree.to_source()).filter(|text| text != file.content),
            Mode::Check => None,
        };
        Ok(Processed {
            diagnostics,
            fixed_source,
        })
    }
}

fn check_order(rules: &[RuleBox]) -> Result<(), RuleSetError> {
    for (index, rule) in rules.iter().enumerate() {
        for &dependency in rule.runs_after() {
            let misplaced = rules[index + 1..].iter().any(|r| r.name() == dependency);
            if misplaced || dependency == rule.name() {
                return Err(RuleSetError::Ordering {
                    rule: rule.name(),
                    dependency,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::kind::NodeKind;
    use crate::parser::KotlinParser;
    use crate::rule::Rule;
    use crate::tree::NodeId;
    use crate::warnings::Warning;

    static UPPER: Warning = Warning::new("UPPER", "1.0.1", "identifier should be upper case", true);
    static SHORT: Warning = Warning::new("SHORT", "1.0.2", "identifier is short", false);
    static UNKNOWN: Warning = Warning::new("UNKNOWN", "1.0.3", "not in catalog", false);

    fn registry() -> Arc<WarningRegistry> {
        Arc::new(WarningRegistry::new([&UPPER, &SHORT]).unwrap())
    }

    /// Upper-cases identifiers.
    struct Upper;

    impl Rule for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }

        fn warnings(&self) -> &'static [&'static Warning] {
            static WARNINGS: [&Warning; 1] = [&UPPER];
            &WARNINGS
        }

        fn visit_node(&self, tree: &mut SyntaxTree, node: NodeId, ctx: &mut RuleContext<'_>) -> Result<(), TreeConsistencyError> {
            if tree.kind(node) != NodeKind::Identifier {
                return Ok(());
            }
            let text = tree.leaf_text(node).to_string();
            let upper = text.to_uppercase();
            if text != upper {
                ctx.warn_and_fix(tree, &UPPER, node, &text, |t| t.set_leaf_text(node, upper))?;
            }
            Ok(())
        }
    }

    /// Reports single-letter lower-case identifiers; must see `Upper`'s fixes.
    struct Short;

    impl Rule for Short {
        fn name(&self) -> &'static str {
            "short"
        }

        fn warnings(&self) -> &'static [&'static Warning] {
            static WARNINGS: [&Warning; 1] = [&SHORT];
            &WARNINGS
        }

        fn runs_after(&self) -> &'static [&'static str] {
            &["upper"]
        }

        fn visit_node(&self, tree: &mut SyntaxTree, node: NodeId, ctx: &mut RuleContext<'_>) -> Result<(), TreeConsistencyError> {
            let text = tree.leaf_text(node);
            if tree.kind(node) == NodeKind::Identifier && text.len() == 1 && text != text.to_uppercase() {
                ctx.warn(tree, &SHORT, node, text);
            }
            Ok(())
        }
    }

    struct Unknown;

    impl Rule for Unknown {
        fn name(&self) -> &'static str {
            "unknown"
        }

        fn warnings(&self) -> &'static [&'static Warning] {
            static WARNINGS: [&Warning; 1] = [&UNKNOWN];
            &WARNINGS
        }
    }

    fn upper_factory(_: &RulesConfig) -> RuleBox {
        Box::new(Upper)
    }

    fn short_factory(_: &RulesConfig) -> RuleBox {
        Box::new(Short)
    }

    fn rule_set(config: &str, factories: &[RuleFactory]) -> Result<RuleSet, RuleSetError> {
        let config = Config::parse(config).unwrap().rules;
        RuleSet::build(registry(), Arc::new(config), factories)
    }

    // --- Construction tests ---

    #[test]
    fn ordering_constraint_is_enforced() {
        assert!(rule_set("", &[upper_factory, short_factory]).is_ok());
        assert_eq!(
            rule_set("", &[short_factory, upper_factory]).unwrap_err(),
            RuleSetError::Ordering {
                rule: "short",
                dependency: "upper"
            }
        );
        // Missing dependencies don't constrain anything.
        assert!(rule_set("", &[short_factory]).is_ok());
    }

    #[test]
    fn unregistered_and_duplicate_rules_are_rejected() {
        let err = RuleSet::from_rules(registry(), Arc::default(), vec![Box::new(Unknown)]).unwrap_err();
        assert_eq!(
            err,
            RuleSetError::UnregisteredWarning {
                rule: "unknown",
                warning: "UNKNOWN"
            }
        );
        assert_eq!(
            rule_set("", &[upper_factory, upper_factory]).unwrap_err(),
            RuleSetError::DuplicateRule("upper")
        );
    }

    // --- Execution tests ---

    #[test]
    fn later_rules_see_earlier_fixes() {
        let set = rule_set("", &[upper_factory, short_factory]).unwrap();
        let file = FileContext::from_source("val a = b\n");

        let check = set.process_source(&KotlinParser, &file, Mode::Check).unwrap();
        let names: Vec<_> = check.diagnostics.iter().map(|d| d.warning.name).collect();
        assert_eq!(names, ["UPPER", "UPPER", "SHORT", "SHORT"]);
        assert_eq!(check.fixed_source, None);

        let fix = set.process_source(&KotlinParser, &file, Mode::Fix).unwrap();
        let names: Vec<_> = fix.diagnostics.iter().map(|d| d.warning.name).collect();
        assert_eq!(names, ["UPPER", "UPPER"]);
        assert!(fix.diagnostics.iter().all(|d| d.corrected));
        assert_eq!(fix.fixed_source.as_deref(), Some("val A = B\n"));
    }

    #[test]
    fn disabled_rules_are_skipped() {
        let set = rule_set("[rules.UPPER]\nenabled = false\n", &[upper_factory, short_factory]).unwrap();
        let file = FileContext::from_source("val a = b\n");
        let fix = set.process_source(&KotlinParser, &file, Mode::Fix).unwrap();
        assert_eq!(fix.diagnostics.len(), 2);
        assert_eq!(fix.fixed_source, None);
    }

    #[test]
    fn unchanged_text_yields_no_fixed_source() {
        let set = rule_set("", &[upper_factory]).unwrap();
        let file = FileContext::from_source("val A = B\n");
        let fix = set.process_source(&KotlinParser, &file, Mode::Fix).unwrap();
        assert!(fix.diagnostics.is_empty());
        assert_eq!(fix.fixed_source, None);
    }

    #[test]
    fn parse_errors_are_reported() {
        let set = rule_set("", &[upper_factory]).unwrap();
        let file = FileContext::from_source("fun f() {\n");
        let err = set.process_source(&KotlinParser, &file, Mode::Check).unwrap_err();
        assert!(matches!(err, ProcessError::Parse(ParseError::Unclosed { .. })));
    }

    struct Broken;

    impl Rule for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn warnings(&self) -> &'static [&'static Warning] {
            static WARNINGS: [&Warning; 1] = [&SHORT];
            &WARNINGS
        }

        fn visit(&self, tree: &mut SyntaxTree, _ctx: &mut RuleContext<'_>) -> Result<(), TreeConsistencyError> {
            tree.remove(tree.root())
        }
    }

    #[test]
    fn invalid_mutation_names_the_rule() {
        let set = RuleSet::from_rules(registry(), Arc::default(), vec![Box::new(Broken)]).unwrap();
        let file = FileContext::from_source("val a = 1\n");
        let err = set.process_source(&KotlinParser, &file, Mode::Fix).unwrap_err();
        assert!(matches!(
            err,
            ProcessError::Tree {
                rule: "broken",
                source: TreeConsistencyError::RootMutation
            }
        ));
    }
}
