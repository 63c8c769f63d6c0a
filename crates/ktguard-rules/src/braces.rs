//! Rule requiring braces around conditional and loop bodies.
//!
//! # Detected Patterns
//!
//! - `if`/`else` branches that are not blocks, except one-line `if ... else`
//!   expressions and `else` branches calling a scope function
//! - `for`, `while` and `do` bodies that are not blocks
//! - `when` branches wrapping a single statement in braces (the braces are
//!   removed instead)
//!
//! # Configuration
//!
//! - `scopeFunctions`: calls that exempt an `else` branch
//!   (default: `let`, `run`, `apply`, `also`)

use crate::catalog::NO_BRACES_IN_CONDITIONALS_AND_LOOPS;
use crate::utils::{empty_block_in, insert_all_after, line_indent, wrap_in_block};
use ktguard_core::{
    Keyword, NodeId, NodeKind, Rule, RuleBox, RuleContext, RulesConfig, SyntaxTree,
    TreeConsistencyError, Warning,
};

/// Rule name for braces-rule.
pub const NAME: &str = "braces-rule";

const INDENT_STEP: usize = 4;

const SCOPE_FUNCTIONS: &[&str] = &["let", "run", "apply", "also"];

/// Adds missing braces to conditionals and loops.
#[derive(Debug, Clone)]
pub struct BracesInConditionalsAndLoops {
    scope_functions: Vec<String>,
}

impl Default for BracesInConditionalsAndLoops {
    fn default() -> Self {
        Self {
            scope_functions: SCOPE_FUNCTIONS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl BracesInConditionalsAndLoops {
    /// Reads the options of `NO_BRACES_IN_CONDITIONALS_AND_LOOPS`.
    #[must_use]
    pub fn from_config(config: &RulesConfig) -> Self {
        let mut rule = Self::default();
        if let Some(entry) = config.get(NO_BRACES_IN_CONDITIONALS_AND_LOOPS.name) {
            let configured = entry.get_str_array("scopeFunctions");
            if !configured.is_empty() {
                rule.scope_functions = configured;
            }
        }
        rule
    }

    /// Factory for the rule set.
    #[must_use]
    pub fn boxed(config: &RulesConfig) -> RuleBox {
        Box::new(Self::from_config(config))
    }

    fn check_if(
        &self,
        tree: &mut SyntaxTree,
        node: NodeId,
        ctx: &mut RuleContext<'_>,
    ) -> Result<(), TreeConsistencyError> {
        if is_single_line_if_else(tree, node) {
            return Ok(());
        }
        let indent = line_indent(tree, node);
        let if_keyword = keyword_child(tree, node, Keyword::If).unwrap_or(node);
        let else_keyword = keyword_child(tree, node, Keyword::Else);
        let then_body = tree
            .find_child(node, NodeKind::Then)
            .and_then(|then| tree.significant_children(then).next());

        if then_body.map_or(true, |body| tree.kind(body) != NodeKind::Block) {
            let condition = tree.find_child(node, NodeKind::Parens).unwrap_or(if_keyword);
            ctx.warn_and_fix(tree, &NO_BRACES_IN_CONDITIONALS_AND_LOOPS, if_keyword, "IF", |tree| {
                if let Some(body) = then_body {
                    wrap_in_block(tree, body, indent, INDENT_STEP)?;
                    if let Some(keyword) = else_keyword {
                        if let Some(space) = tree
                            .prev_sibling(keyword)
                            .filter(|&s| tree.kind(s) == NodeKind::WhiteSpace)
                        {
                            tree.set_leaf_text(space, " ")?;
                        }
                    }
                    Ok(())
                } else {
                    insert_empty_body(tree, condition, NodeKind::Then, indent)
                }
            })?;
        }

        let Some(else_keyword) = else_keyword else {
            return Ok(());
        };
        let else_body = tree
            .find_child(node, NodeKind::Else)
            .and_then(|branch| tree.significant_children(branch).next());
        if else_body.is_some_and(|body| {
            matches!(tree.kind(body), NodeKind::If | NodeKind::Block) || self.calls_scope_function(tree, body)
        }) {
            return Ok(());
        }
        ctx.warn_and_fix(tree, &NO_BRACES_IN_CONDITIONALS_AND_LOOPS, else_keyword, "ELSE", |tree| {
            match else_body {
                Some(body) => wrap_in_block(tree, body, indent, INDENT_STEP).map(|_| ()),
                None => insert_empty_body(tree, else_keyword, NodeKind::Else, indent),
            }
        })?;
        Ok(())
    }

    fn calls_scope_function(&self, tree: &SyntaxTree, body: NodeId) -> bool {
        tree.preorder(body).any(|n| {
            tree.kind(n) == NodeKind::Identifier
                && self.scope_functions.iter().any(|f| f == tree.leaf_text(n))
                && tree
                    .next_significant_sibling(n)
                    .is_some_and(|next| matches!(tree.kind(next), NodeKind::Lambda | NodeKind::Parens))
        })
    }

    fn check_loop(
        &self,
        tree: &mut SyntaxTree,
        node: NodeId,
        ctx: &mut RuleContext<'_>,
    ) -> Result<(), TreeConsistencyError> {
        let body = tree
            .find_child(node, NodeKind::Body)
            .and_then(|b| tree.significant_children(b).next());
        if body.is_some_and(|b| tree.kind(b) == NodeKind::Block) {
            return Ok(());
        }
        let (label, keyword) = match tree.kind(node) {
            NodeKind::For => ("FOR", Keyword::For),
            NodeKind::While => ("WHILE", Keyword::While),
            _ => ("DO_WHILE", Keyword::Do),
        };
        let anchor = if keyword == Keyword::Do {
            keyword_child(tree, node, Keyword::Do)
        } else {
            tree.find_child(node, NodeKind::Parens)
                .or_else(|| keyword_child(tree, node, keyword))
        }
        .unwrap_or(node);
        let indent = line_indent(tree, node);
        ctx.warn_and_fix(tree, &NO_BRACES_IN_CONDITIONALS_AND_LOOPS, node, label, |tree| match body {
            Some(body) => wrap_in_block(tree, body, indent, INDENT_STEP).map(|_| ()),
            None => insert_empty_body(tree, anchor, NodeKind::Body, indent),
        })?;
        Ok(())
    }

    fn check_when(
        &self,
        tree: &mut SyntaxTree,
        node: NodeId,
        ctx: &mut RuleContext<'_>,
    ) -> Result<(), TreeConsistencyError> {
        let entries: Vec<NodeId> = tree
            .children(node)
            .iter()
            .copied()
            .filter(|&c| tree.kind(c) == NodeKind::WhenEntry)
            .collect();
        for entry in entries {
            let Some(block) = tree.find_child(entry, NodeKind::Block) else {
                continue;
            };
            let Some(statement) = single_statement(tree, block) else {
                continue;
            };
            ctx.warn_and_fix(tree, &NO_BRACES_IN_CONDITIONALS_AND_LOOPS, block, "WHEN", |tree| {
                tree.remove(statement)?;
                tree.replace(block, statement)
            })?;
        }
        Ok(())
    }
}

impl Rule for BracesInConditionalsAndLoops {
    fn name(&self) -> &'static str {
        NAME
    }

    fn warnings(&self) -> &'static [&'static Warning] {
        static WARNINGS: [&Warning; 1] = [&NO_BRACES_IN_CONDITIONALS_AND_LOOPS];
        &WARNINGS
    }

    fn description(&self) -> &'static str {
        "Requires braces around conditional and loop bodies"
    }

    fn visit_node(
        &self,
        tree: &mut SyntaxTree,
        node: NodeId,
        ctx: &mut RuleContext<'_>,
    ) -> Result<(), TreeConsistencyError> {
        match tree.kind(node) {
            NodeKind::If => self.check_if(tree, node, ctx),
            NodeKind::When => self.check_when(tree, node, ctx),
            NodeKind::For | NodeKind::While | NodeKind::DoWhile => self.check_loop(tree, node, ctx),
            _ => Ok(()),
        }
    }
}

fn keyword_child(tree: &SyntaxTree, node: NodeId, keyword: Keyword) -> Option<NodeId> {
    tree.find_child(node, NodeKind::Keyword(keyword))
}

/// `if (a) b else c` on one line, unless it continues an `else if` chain.
fn is_single_line_if_else(tree: &SyntaxTree, node: NodeId) -> bool {
    tree.find_child(node, NodeKind::Else).is_some()
        && tree.parent(node).map(|p| tree.kind(p)) != Some(NodeKind::Else)
        && !tree.text(node).contains('\n')
}

/// The only statement of a block without comments.
fn single_statement(tree: &SyntaxTree, block: NodeId) -> Option<NodeId> {
    let children = tree.children(block);
    if children.iter().any(|&c| tree.kind(c).is_comment()) {
        return None;
    }
    let mut statements = children.iter().copied().filter(|&c| {
        !matches!(
            tree.kind(c),
            NodeKind::LBrace | NodeKind::RBrace | NodeKind::WhiteSpace | NodeKind::Semicolon
        )
    });
    let first = statements.next()?;
    statements.next().is_none().then_some(first)
}

fn insert_empty_body(
    tree: &mut SyntaxTree,
    anchor: NodeId,
    kind: NodeKind,
    indent: usize,
) -> Result<(), TreeConsistencyError> {
    let space = tree.new_leaf(NodeKind::WhiteSpace, " ");
    let body = empty_block_in(tree, kind, indent)?;
    insert_all_after(tree, anchor, &[space, body])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{assert_fixed, check, fix};

    fn rule(config: &RulesConfig) -> RuleBox {
        BracesInConditionalsAndLoops::boxed(config)
    }

    // --- if / else ---

    #[test]
    fn test_if_without_braces_is_wrapped() {
        let outcome = fix(rule, "if (x) foo()");
        assert_eq!(outcome.text, "if (x) {\n    foo()\n}");
        assert_eq!(
            outcome.messages(),
            ["[NO_BRACES_IN_CONDITIONALS_AND_LOOPS] in if, else, when, for, do, and while statements braces should be used: IF"]
        );
        assert!(outcome.diagnostics[0].corrected);
    }

    #[test]
    fn test_check_mode_leaves_text() {
        let outcome = check(rule, "if (x) foo()");
        assert_eq!(outcome.text, "if (x) foo()");
        assert_eq!(outcome.offsets(), [0]);
        assert!(outcome.diagnostics[0].can_be_auto_corrected);
        assert!(!outcome.diagnostics[0].corrected);
    }

    #[test]
    fn test_if_else_on_separate_lines() {
        assert_fixed(
            rule,
            "",
            "fun f() {\n    if (a) b()\n    else c()\n}\n",
            "fun f() {\n    if (a) {\n        b()\n    } else {\n        c()\n    }\n}\n",
        );
    }

    #[test]
    fn test_single_line_if_else_is_allowed() {
        assert!(check(rule, "val x = if (a) 1 else 2\n").diagnostics.is_empty());
    }

    #[test]
    fn test_else_if_chain() {
        let source = "if (a) {\n    b()\n} else if (c) {\n    d()\n} else {\n    e()\n}\n";
        assert!(check(rule, source).diagnostics.is_empty());
    }

    #[test]
    fn test_else_with_scope_function_is_allowed() {
        let source = "if (a) {\n    b()\n} else x?.let { c(it) }\n";
        assert!(check(rule, source).diagnostics.is_empty());
    }

    #[test]
    fn test_missing_then_body() {
        assert_fixed(rule, "", "if (x)\n", "if (x) {\n}\n");
    }

    // --- loops ---

    #[test]
    fn test_loops_are_wrapped() {
        assert_fixed(
            rule,
            "",
            "for (i in 1..10) println(i)\nwhile (x) step()\n",
            "for (i in 1..10) {\n    println(i)\n}\nwhile (x) {\n    step()\n}\n",
        );
    }

    #[test]
    fn test_do_while() {
        let outcome = check(rule, "do step() while (x)\n");
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(outcome.messages()[0].ends_with(": DO_WHILE"));
        assert_fixed(rule, "", "do step() while (x)\n", "do {\n    step()\n} while (x)\n");
    }

    #[test]
    fn test_loop_with_block_passes() {
        assert!(check(rule, "for (i in l) {\n    g(i)\n}\n").diagnostics.is_empty());
    }

    // --- when ---

    #[test]
    fn test_when_single_statement_block_is_unwrapped() {
        assert_fixed(
            rule,
            "",
            "when (x) {\n    1 -> { a() }\n    else -> b()\n}\n",
            "when (x) {\n    1 -> a()\n    else -> b()\n}\n",
        );
    }

    #[test]
    fn test_when_block_with_comment_is_kept() {
        let source = "when (x) {\n    1 -> {\n        // why\n        a()\n    }\n}\n";
        assert!(check(rule, source).diagnostics.is_empty());
    }

    // --- suppression ---

    #[test]
    fn test_suppressed_by_annotation() {
        let source = "@Suppress(\"NO_BRACES_IN_CONDITIONALS_AND_LOOPS\")\nfun f() {\n    if (x) g()\n}\n";
        assert!(fix(rule, source).diagnostics.is_empty());
        assert_eq!(fix(rule, source).text, source);
    }

    #[test]
    fn test_scope_functions_option() {
        let config = "[rules.NO_BRACES_IN_CONDITIONALS_AND_LOOPS]\nscopeFunctions = [\"use\"]\n";
        let source = "if (a) {\n    b()\n} else x.let { c(it) }\n";
        let outcome = crate::test_support::run_with(rule, config, source, ktguard_core::Mode::Check);
        assert_eq!(outcome.diagnostics.len(), 1);
    }
}
