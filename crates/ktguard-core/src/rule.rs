//! Rule trait and the per-visit emission context.
//!
//! A rule walks one file's [`SyntaxTree`] and reports through a
//! [`RuleContext`]. In [`Mode::Fix`] a rule may also mutate the tree; the
//! context decides whether a fix is allowed for the warning at hand.
//!
//! # Example
//!
//! ```ignore
//! static NO_TODO: Warning = Warning::new("NO_TODO", "9.9.9", "TODO comments are not allowed", false);
//!
//! struct NoTodo;
//!
//! impl Rule for NoTodo {
//!     fn name(&self) -> &'static str { "no-todo" }
//!     fn warnings(&self) -> &'static [&'static Warning] {
//!         static WARNINGS: [&Warning; 1] = [&NO_TODO];
//!         &WARNINGS
//!     }
//!
//!     fn visit_node(&self, tree: &mut SyntaxTree, node: NodeId, ctx: &mut RuleContext<'_>)
//!         -> Result<(), TreeConsistencyError>
//!     {
//!         if tree.kind(node) == NodeKind::EolComment && tree.leaf_text(node).contains("TODO") {
//!             ctx.warn(tree, &NO_TODO, node, "");
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use crate::config::{RuleConfig, RulesConfig};
use crate::context::FileContext;
use crate::kind::NodeKind;
use crate::tree::{NodeId, SyntaxTree, TreeConsistencyError};
use crate::types::Severity;
use crate::utils::allowance::check_allow;
use crate::warnings::Warning;

/// Whether rules only report or also correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Report only.
    #[default]
    Check,
    /// Report and apply fixes.
    Fix,
}

/// One violation emitted during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The warning raised.
    pub warning: &'static Warning,
    /// Byte offset in the original text.
    pub offset: usize,
    /// Full message, `[NAME] text: details`.
    pub message: String,
    /// Whether the rule offers a fix for this occurrence.
    pub can_be_auto_corrected: bool,
    /// Whether the fix was applied.
    pub corrected: bool,
    /// Effective severity.
    pub severity: Severity,
}

/// A per-file lint rule operating on a [`SyntaxTree`].
///
/// Instances are created per run by a [`RuleFactory`] and must not keep
/// per-file state; use the [`RuleContext`] or locals inside `visit`.
pub trait Rule: Send + Sync {
    /// Returns the kebab-case name of this rule (e.g. "braces-rule").
    fn name(&self) -> &'static str;

    /// Every warning this rule can raise.
    fn warnings(&self) -> &'static [&'static Warning];

    /// Returns a brief description of what this rule checks.
    fn description(&self) -> &'static str {
        ""
    }

    /// Names of rules that must run before this one.
    fn runs_after(&self) -> &'static [&'static str] {
        &[]
    }

    /// Visits the whole tree.
    ///
    /// The default snapshots the pre-order node list first and then calls
    /// [`Rule::visit_node`] for every node that is still attached, so nodes
    /// created by a fix are never visited and nodes removed by one are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`TreeConsistencyError`] if a fix performs an invalid mutation.
    fn visit(&self, tree: &mut SyntaxTree, ctx: &mut RuleContext<'_>) -> Result<(), TreeConsistencyError> {
        let nodes: Vec<NodeId> = tree.preorder(tree.root()).collect();
        for node in nodes {
            if tree.is_attached(node) {
                self.visit_node(tree, node, ctx)?;
            }
        }
        Ok(())
    }

    /// Visits a single node.
    ///
    /// # Errors
    ///
    /// Returns [`TreeConsistencyError`] if a fix performs an invalid mutation.
    fn visit_node(
        &self,
        tree: &mut SyntaxTree,
        node: NodeId,
        ctx: &mut RuleContext<'_>,
    ) -> Result<(), TreeConsistencyError> {
        let _ = (tree, node, ctx);
        Ok(())
    }
}

/// Type alias for boxed Rule trait objects.
pub type RuleBox = Box<dyn Rule>;

/// Creates a rule instance from the active configuration.
pub type RuleFactory = fn(&RulesConfig) -> RuleBox;

/// Emission context for one rule visiting one file.
pub struct RuleContext<'a> {
    file: &'a FileContext<'a>,
    config: &'a RulesConfig,
    mode: Mode,
    file_suppressions: Option<Vec<String>>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> RuleContext<'a> {
    /// Creates an empty context.
    #[must_use]
    pub fn new(file: &'a FileContext<'a>, config: &'a RulesConfig, mode: Mode) -> Self {
        Self {
            file,
            config,
            mode,
            file_suppressions: None,
            diagnostics: Vec::new(),
        }
    }

    /// The file being visited.
    #[must_use]
    pub fn file(&self) -> &FileContext<'a> {
        self.file
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RulesConfig {
        self.config
    }

    /// Configuration entry of a warning.
    #[must_use]
    pub fn rule_config(&self, warning: &Warning) -> Option<&RuleConfig> {
        self.config.get(warning.name)
    }

    /// Returns `true` in fix mode.
    #[must_use]
    pub fn is_fix_mode(&self) -> bool {
        self.mode == Mode::Fix
    }

    /// Returns `true` if the warning is enabled in the configuration.
    #[must_use]
    pub fn is_enabled(&self, warning: &Warning) -> bool {
        self.config.is_enabled(warning.name)
    }

    /// Diagnostics emitted so far.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consumes the context, returning diagnostics in emission order.
    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Reports a violation at `node` without offering a fix.
    ///
    /// Returns `true` if the diagnostic was recorded.
    pub fn warn(&mut self, tree: &SyntaxTree, warning: &'static Warning, node: NodeId, free_text: &str) -> bool {
        let offset = tree.start_offset(node);
        self.warn_at(tree, warning, node, offset, free_text)
    }

    /// Like [`Self::warn`] with an explicit offset inside `node`.
    pub fn warn_at(
        &mut self,
        tree: &SyntaxTree,
        warning: &'static Warning,
        node: NodeId,
        offset: usize,
        free_text: &str,
    ) -> bool {
        if !self.should_report(tree, warning, node, offset) {
            return false;
        }
        self.push(warning, offset, free_text, false, false);
        true
    }

    /// Reports a fixable violation and applies `fix` when allowed.
    ///
    /// The fix runs only in fix mode, for auto-correctable warnings whose
    /// `autoCorrect` option is on, and only if the diagnostic itself was not
    /// disabled or suppressed. Returns whether the fix ran.
    ///
    /// # Errors
    ///
    /// Propagates errors from `fix`.
    pub fn warn_and_fix<F>(
        &mut self,
        tree: &mut SyntaxTree,
        warning: &'static Warning,
        node: NodeId,
        free_text: &str,
        fix: F,
    ) -> Result<bool, TreeConsistencyError>
    where
        F: FnOnce(&mut SyntaxTree) -> Result<(), TreeConsistencyError>,
    {
        let offset = tree.start_offset(node);
        self.warn_and_fix_at(tree, warning, node, offset, free_text, fix)
    }

    /// Like [`Self::warn_and_fix`] with an explicit offset inside `node`.
    ///
    /// # Errors
    ///
    /// Propagates errors from `fix`.
    pub fn warn_and_fix_at<F>(
        &mut self,
        tree: &mut SyntaxTree,
        warning: &'static Warning,
        node: NodeId,
        offset: usize,
        free_text: &str,
        fix: F,
    ) -> Result<bool, TreeConsistencyError>
    where
        F: FnOnce(&mut SyntaxTree) -> Result<(), TreeConsistencyError>,
    {
        if !self.should_report(tree, warning, node, offset) {
            return Ok(false);
        }
        let apply = self.is_fix_mode()
            && warning.can_be_auto_corrected
            && self.rule_config(warning).map_or(true, RuleConfig::auto_correct);
        if apply {
            fix(tree)?;
        }
        self.push(warning, offset, free_text, warning.can_be_auto_corrected, apply);
        Ok(apply)
    }

    fn push(&mut self, warning: &'static Warning, offset: usize, free_text: &str, fixable: bool, corrected: bool) {
        let severity = self
            .config
            .severity(warning.name)
            .unwrap_or(warning.default_severity);
        self.diagnostics.push(Diagnostic {
            warning,
            offset,
            message: warning.message(free_text.trim()),
            can_be_auto_corrected: fixable,
            corrected,
            severity,
        });
    }

    fn should_report(&mut self, tree: &SyntaxTree, warning: &Warning, node: NodeId, offset: usize) -> bool {
        self.is_enabled(warning) && !self.is_suppressed(tree, warning, node, offset)
    }

    /// Returns `true` if the warning is suppressed at `node`.
    ///
    /// Sources, in order: `ignoreTests` for test files, a
    /// `// ktguard: allow(NAME)` comment on the line or the line above,
    /// `@file:Suppress("NAME")`, `@Suppress("NAME")` on the node or an
    /// enclosing declaration or statement, and annotations listed in
    /// `ignoreAnnotated`.
    pub fn is_suppressed(&mut self, tree: &SyntaxTree, warning: &Warning, node: NodeId, offset: usize) -> bool {
        let rule_config = self.config.get(warning.name);
        if self.file.is_test && rule_config.is_some_and(RuleConfig::ignore_tests) {
            return true;
        }

        if check_allow(tree, node, offset, warning.name).is_allowed() {
            return true;
        }

        let file_suppressions = self
            .file_suppressions
            .get_or_insert_with(|| file_level_suppressions(tree));
        if file_suppressions.iter().any(|n| n == warning.name) {
            return true;
        }

        let ignore_annotated = rule_config.map(RuleConfig::ignore_annotated).unwrap_or_default();
        std::iter::once(node)
            .chain(tree.ancestors(node))
            .flat_map(|n| annotations(tree, n))
            .any(|annotation| {
                (is_suppress(&annotation.name) && annotation.args.iter().any(|a| a == warning.name))
                    || ignore_annotated.iter().any(|i| annotation.simple_name() == i)
            })
    }
}

/// Annotation found in front of a declaration or statement.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Annotation {
    /// Name without `@`, including a use-site target (`file:Suppress`).
    name: String,
    /// String literal arguments without quotes.
    args: Vec<String>,
}

impl Annotation {
    fn simple_name(&self) -> &str {
        let name = self.name.rsplit(':').next().unwrap_or(&self.name);
        name.rsplit('.').next().unwrap_or(name)
    }
}

fn is_suppress(name: &str) -> bool {
    matches!(name, "Suppress" | "kotlin.Suppress" | "SuppressWarnings")
}

/// Annotations attached to `node`: the modifiers of a declaration or the
/// leading annotations of a statement.
fn annotations(tree: &SyntaxTree, node: NodeId) -> Vec<Annotation> {
    match tree.kind(node) {
        NodeKind::Function | NodeKind::Class => tree
            .find_child(node, NodeKind::Modifiers)
            .map(|modifiers| leading_annotations(tree, modifiers))
            .unwrap_or_default(),
        NodeKind::Statement => leading_annotations(tree, node),
        _ => Vec::new(),
    }
}

/// Reads annotations from the leaves of `node` until the first leaf that is
/// neither trivia, an annotation nor part of annotation arguments.
fn leading_annotations(tree: &SyntaxTree, node: NodeId) -> Vec<Annotation> {
    let mut result: Vec<Annotation> = Vec::new();
    let mut depth = 0usize;
    for leaf in tree.preorder(node).filter(|&n| tree.is_leaf(n)) {
        let kind = tree.kind(leaf);
        let text = tree.leaf_text(leaf);
        if depth > 0 {
            match kind {
                NodeKind::LParen => depth += 1,
                NodeKind::RParen => depth -= 1,
                NodeKind::StringLiteral => {
                    if let Some(last) = result.last_mut() {
                        last.args.push(text.trim_matches('"').to_string());
                    }
                }
                _ => {}
            }
            continue;
        }
        match kind {
            NodeKind::Annotation => result.push(Annotation {
                name: text.trim_start_matches('@').to_string(),
                args: Vec::new(),
            }),
            NodeKind::LParen if !result.is_empty() => depth = 1,
            k if k.is_trivia() => {}
            // Modifier keywords such as `override` sit between annotations.
            NodeKind::Identifier if tree.kind(node) == NodeKind::Modifiers => {}
            _ => break,
        }
    }
    result
}

fn file_level_suppressions(tree: &SyntaxTree) -> Vec<String> {
    tree.children(tree.root())
        .iter()
        .filter(|&&child| tree.kind(child) == NodeKind::Statement)
        .flat_map(|&child| leading_annotations(tree, child))
        .filter(|a| a.name.strip_prefix("file:").is_some_and(is_suppress))
        .flat_map(|a| a.args)
        .collect()
}
