//! Rule checking indentation.
//!
//! Expected indentation is derived from the tree: the contents of braces,
//! parentheses and brackets are indented one step from the line that opens
//! them, closing delimiters line up with that line, and a line continuing a
//! statement from an earlier line gets one extra step. Tabs are replaced
//! with spaces and the file must end with exactly one line break.
//!
//! Runs last, after every rule that changes structure.
//!
//! # Configuration
//!
//! - `indentationSize`: spaces per step (default: 4)
//! - `newlineAtEnd`: require a single trailing line break (default: true)
//! - `alignedParameters`: parameters continuing the line of `(` align with
//!   the first one (default: true)

use crate::catalog::WRONG_INDENTATION;
use crate::utils::{ends_line, line_indent, line_start_leaf};
use ktguard_core::{
    Keyword, NodeId, NodeKind, Rule, RuleBox, RuleContext, RulesConfig, SyntaxTree,
    TreeConsistencyError, Warning,
};
use std::collections::HashMap;

/// Rule name for indentation.
pub const NAME: &str = "indentation";

/// Checks and fixes indentation.
#[derive(Debug, Clone)]
pub struct Indentation {
    size: usize,
    newline_at_end: bool,
    aligned_parameters: bool,
}

impl Default for Indentation {
    fn default() -> Self {
        Self {
            size: 4,
            newline_at_end: true,
            aligned_parameters: true,
        }
    }
}

/// Expected indentation of the lines seen so far, by first leaf.
type Known = HashMap<NodeId, usize>;

impl Indentation {
    /// Reads the options of `WRONG_INDENTATION`.
    #[must_use]
    pub fn from_config(config: &RulesConfig) -> Self {
        let mut rule = Self::default();
        if let Some(entry) = config.get(WRONG_INDENTATION.name) {
            rule.size = entry.get_usize("indentationSize", rule.size).max(1);
            rule.newline_at_end = entry.get_bool("newlineAtEnd", rule.newline_at_end);
            rule.aligned_parameters = entry.get_bool("alignedParameters", rule.aligned_parameters);
        }
        rule
    }

    /// Factory for the rule set.
    #[must_use]
    pub fn boxed(config: &RulesConfig) -> RuleBox {
        Box::new(Self::from_config(config))
    }

    fn width(&self, indent: &str) -> usize {
        indent.chars().map(|c| if c == '\t' { self.size } else { 1 }).sum()
    }

    fn check_tabs(
        &self,
        tree: &mut SyntaxTree,
        space: NodeId,
        ctx: &mut RuleContext<'_>,
    ) -> Result<(), TreeConsistencyError> {
        let text = tree.leaf_text(space);
        if !text.contains('\t') {
            return Ok(());
        }
        let replacement = if text.contains('\n') {
            text.replace('\t', &" ".repeat(self.size))
        } else {
            " ".to_string()
        };
        ctx.warn_and_fix(tree, &WRONG_INDENTATION, space, "tabs are not allowed for indentation", |tree| {
            tree.set_leaf_text(space, replacement)
        })?;
        Ok(())
    }

    fn check_line(
        &self,
        tree: &mut SyntaxTree,
        space: NodeId,
        first: NodeId,
        expected: usize,
        ctx: &mut RuleContext<'_>,
    ) -> Result<(), TreeConsistencyError> {
        let text = tree.leaf_text(space);
        let (head, indent) = text.split_at(text.rfind('\n').map_or(0, |pos| pos + 1));
        let actual = self.width(indent);
        if actual == expected {
            return Ok(());
        }
        let fixed = format!("{head}{}", " ".repeat(expected));
        let message = format!("expected {expected} but was {actual}");
        ctx.warn_and_fix(tree, &WRONG_INDENTATION, first, &message, |tree| {
            tree.set_leaf_text(space, fixed)
        })?;
        Ok(())
    }

    fn check_end_of_file(
        &self,
        tree: &mut SyntaxTree,
        ctx: &mut RuleContext<'_>,
    ) -> Result<(), TreeConsistencyError> {
        let Some(last) = tree.last_leaf(tree.root()) else {
            return Ok(());
        };
        if tree.kind(last) != NodeKind::WhiteSpace || !tree.leaf_text(last).contains('\n') {
            let root = tree.root();
            ctx.warn_and_fix(tree, &WRONG_INDENTATION, last, "no newline at the end of file", |tree| {
                let newline = tree.new_leaf(NodeKind::WhiteSpace, "\n");
                tree.append_child(root, newline)
            })?;
        } else if tree.leaf_text(last) != "\n" {
            ctx.warn_and_fix(
                tree,
                &WRONG_INDENTATION,
                last,
                "there should be exactly one line break at the end of file",
                |tree| tree.set_leaf_text(last, "\n"),
            )?;
        }
        Ok(())
    }

    /// Expected indentation of the line starting with `leaf`.
    fn expected_indent(&self, tree: &SyntaxTree, leaf: NodeId, known: &Known) -> usize {
        let mut child = leaf;
        let mut current = tree.parent(leaf);
        while let Some(node) = current {
            if let Some(indent) = self.container_indent(tree, node, child, leaf, known) {
                return indent;
            }
            if is_statement_like(tree.kind(node)) {
                if let Some(first) = tree.first_leaf(node).filter(|&f| f != leaf) {
                    let base = indent_of_line(tree, first, known);
                    return if continues(tree, node, leaf) {
                        base + self.size
                    } else {
                        base
                    };
                }
            }
            child = node;
            current = tree.parent(node);
        }
        0
    }

    /// Indentation inside a delimited node, if `child` lies after its
    /// opening delimiter.
    fn container_indent(
        &self,
        tree: &SyntaxTree,
        node: NodeId,
        child: NodeId,
        leaf: NodeId,
        known: &Known,
    ) -> Option<usize> {
        let kind = tree.kind(node);
        let (open_kind, close_kind) = match kind {
            NodeKind::Block | NodeKind::Lambda | NodeKind::When => (NodeKind::LBrace, NodeKind::RBrace),
            NodeKind::Parens => (NodeKind::LParen, NodeKind::RParen),
            NodeKind::Brackets => (NodeKind::LBracket, NodeKind::RBracket),
            _ => return None,
        };
        let children = tree.children(node);
        let open_index = children.iter().position(|&c| tree.kind(c) == open_kind)?;
        let child_index = children.iter().position(|&c| c == child)?;
        if child_index <= open_index {
            return None;
        }
        let open = children[open_index];
        // Declaration and control-flow bodies follow the line their owner
        // starts on, other groups the line of the opening delimiter.
        let owner = match kind {
            NodeKind::When => Some(node),
            NodeKind::Block => tree
                .ancestors(node)
                .find(|&a| is_statement_like(tree.kind(a)))
                .filter(|&a| tree.kind(a) != NodeKind::Statement),
            _ => None,
        };
        let anchor = owner.and_then(|o| tree.first_leaf(o)).unwrap_or(open);
        let base = indent_of_line(tree, anchor, known);
        if child_index == children.len() - 1 && tree.kind(child) == close_kind {
            return Some(base);
        }
        if !matches!(kind, NodeKind::Parens | NodeKind::Brackets) {
            return Some(base + self.size);
        }

        let parameter_list = tree
            .parent(node)
            .is_some_and(|p| matches!(tree.kind(p), NodeKind::Function | NodeKind::Class));
        if self.aligned_parameters && parameter_list {
            if let Some(first) = first_on_same_line(tree, open) {
                return Some(column(tree, first, known));
            }
        }
        // Inside a group, a line that doesn't start a new element continues
        // the previous one.
        let starts_element = prev_significant_leaf(tree, leaf)
            .is_some_and(|prev| prev == open || tree.kind(prev) == NodeKind::Comma);
        Some(if starts_element {
            base + self.size
        } else {
            base + 2 * self.size
        })
    }
}

impl Rule for Indentation {
    fn name(&self) -> &'static str {
        NAME
    }

    fn warnings(&self) -> &'static [&'static Warning] {
        static WARNINGS: [&Warning; 1] = [&WRONG_INDENTATION];
        &WARNINGS
    }

    fn description(&self) -> &'static str {
        "Checks indentation, tabs and the trailing newline"
    }

    fn runs_after(&self) -> &'static [&'static str] {
        &[
            crate::braces::NAME,
            crate::empty_block::NAME,
            crate::consecutive_spaces::NAME,
        ]
    }

    fn visit(&self, tree: &mut SyntaxTree, ctx: &mut RuleContext<'_>) -> Result<(), TreeConsistencyError> {
        let leaves: Vec<NodeId> = tree.leaves().collect();
        let mut known = Known::new();

        if let Some(&first) = leaves.first() {
            if tree.kind(first) == NodeKind::WhiteSpace && !ends_line(tree, first) {
                if let Some(next) = tree.next_leaf(first) {
                    known.insert(next, 0);
                    self.check_tabs(tree, first, ctx)?;
                    self.check_line(tree, first, next, 0, ctx)?;
                }
            } else {
                known.insert(first, 0);
            }
        }

        for &leaf in &leaves {
            let leading = leaves.first() == Some(&leaf) && !ends_line(tree, leaf);
            if tree.kind(leaf) != NodeKind::WhiteSpace || leading {
                continue;
            }
            self.check_tabs(tree, leaf, ctx)?;
            if !ends_line(tree, leaf) {
                continue;
            }
            let Some(next) = tree.next_leaf(leaf) else {
                continue;
            };
            let expected = self.expected_indent(tree, next, &known);
            known.insert(next, expected);
            self.check_line(tree, leaf, next, expected, ctx)?;
        }

        if self.newline_at_end && !leaves.is_empty() {
            self.check_end_of_file(tree, ctx)?;
        }
        Ok(())
    }
}

fn is_statement_like(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Statement
            | NodeKind::If
            | NodeKind::For
            | NodeKind::While
            | NodeKind::DoWhile
            | NodeKind::When
            | NodeKind::WhenEntry
            | NodeKind::Function
            | NodeKind::Class
    )
}

/// Whether `leaf`, starting a later line of `node`, is a continuation line.
fn continues(tree: &SyntaxTree, node: NodeId, leaf: NodeId) -> bool {
    match tree.kind(leaf) {
        NodeKind::Keyword(Keyword::Else | Keyword::Catch | Keyword::Finally) => return false,
        NodeKind::Keyword(Keyword::While) if tree.kind(node) == NodeKind::DoWhile => return false,
        _ => {}
    }
    let prev = prev_significant_leaf(tree, leaf);
    if prev.is_some_and(|p| tree.kind(p) == NodeKind::Comma && tree.parent(p) == Some(node)) {
        return false;
    }
    if let Some(modifiers) = tree.find_child(node, NodeKind::Modifiers) {
        let in_modifiers = |n: NodeId| tree.ancestors(n).any(|a| a == modifiers);
        if in_modifiers(leaf) || prev.is_some_and(in_modifiers) {
            return false;
        }
    }
    true
}

fn prev_significant_leaf(tree: &SyntaxTree, leaf: NodeId) -> Option<NodeId> {
    std::iter::successors(tree.prev_leaf(leaf), |&l| tree.prev_leaf(l)).find(|&l| !tree.kind(l).is_trivia())
}

/// First leaf of the line containing `leaf`, skipping leading whitespace
/// at the start of the file.
fn line_first(tree: &SyntaxTree, leaf: NodeId) -> NodeId {
    let start = line_start_leaf(tree, leaf);
    if tree.kind(start) == NodeKind::WhiteSpace && start != leaf {
        tree.next_leaf(start).unwrap_or(start)
    } else {
        start
    }
}

fn indent_of_line(tree: &SyntaxTree, leaf: NodeId, known: &Known) -> usize {
    let first = line_first(tree, leaf);
    known
        .get(&first)
        .copied()
        .unwrap_or_else(|| line_indent(tree, first))
}

/// Column of `leaf` once its line has the expected indentation.
fn column(tree: &SyntaxTree, leaf: NodeId, known: &Known) -> usize {
    let first = line_first(tree, leaf);
    let mut width = indent_of_line(tree, leaf, known);
    let mut current = Some(first);
    while let Some(l) = current.filter(|&l| l != leaf) {
        width += tree.leaf_text(l).chars().count();
        current = tree.next_leaf(l);
    }
    width
}

/// First element after `open` when it is on the same line.
fn first_on_same_line(tree: &SyntaxTree, open: NodeId) -> Option<NodeId> {
    let mut next = tree.next_leaf(open)?;
    if tree.kind(next) == NodeKind::WhiteSpace {
        if ends_line(tree, next) {
            return None;
        }
        next = tree.next_leaf(next)?;
    }
    let kind = tree.kind(next);
    (!kind.is_trivia() && !kind.is_closing()).then_some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{assert_fixed, check, run_with};
    use ktguard_core::Mode;

    fn rule(config: &RulesConfig) -> RuleBox {
        Indentation::boxed(config)
    }

    const WELL_FORMED: &str = r#"class A(
    val x: Int,
) : B() {
    /**
     * Doc.
     */
    @Test
    fun f(a: Int) {
        if (a > 0) {
            g(a)
        } else {
            h()
        }
        val y = listOf(1)
            .map { it }
        when (a) {
            1 -> g(a)
            else -> {
                h()
            }
        }
        call(
            a,
            b
                .c(),
        )
    }
}

enum class E {
    A,
    B,
}
"#;

    #[test]
    fn test_well_formed_code_passes() {
        let outcome = check(rule, WELL_FORMED);
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.messages());
    }

    #[test]
    fn test_wrong_indentation_fixed() {
        let outcome = check(rule, "fun f() {\n  g()\n      h()\n}\n");
        assert_eq!(
            outcome.messages(),
            [
                "[WRONG_INDENTATION] only spaces are allowed for indentation and each indentation should equal to 4 spaces (tabs are not allowed): expected 4 but was 2",
                "[WRONG_INDENTATION] only spaces are allowed for indentation and each indentation should equal to 4 spaces (tabs are not allowed): expected 4 but was 6",
            ]
        );
        assert_eq!(outcome.offsets(), [12, 22]);
        assert_fixed(rule, "", "fun f() {\n  g()\n      h()\n}\n", "fun f() {\n    g()\n    h()\n}\n");
    }

    #[test]
    fn test_nested_fix_uses_expected_parent_indent() {
        assert_fixed(
            rule,
            "",
            "fun f() {\nif (x) {\ng()\n}\n}\n",
            "fun f() {\n    if (x) {\n        g()\n    }\n}\n",
        );
    }

    #[test]
    fn test_tabs_replaced() {
        let outcome = check(rule, "fun f() {\n\tg()\n}\n");
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(outcome.messages()[0].ends_with("tabs are not allowed for indentation"));
        assert_fixed(rule, "", "fun f() {\n\tg()\n}\n", "fun f() {\n    g()\n}\n");
    }

    #[test]
    fn test_newline_at_end() {
        assert_fixed(rule, "", "val a = 1", "val a = 1\n");
        assert_fixed(rule, "", "val a = 1\n\n\n", "val a = 1\n");
        let config = "[rules.WRONG_INDENTATION]\nnewlineAtEnd = false\n";
        assert!(run_with(rule, config, "val a = 1", Mode::Check).diagnostics.is_empty());
    }

    #[test]
    fn test_aligned_parameters() {
        assert!(check(rule, "fun f(a: Int,\n      b: Int) {\n    g()\n}\n").diagnostics.is_empty());
        assert_fixed(
            rule,
            "",
            "fun f(a: Int,\n    b: Int) {\n    g()\n}\n",
            "fun f(a: Int,\n      b: Int) {\n    g()\n}\n",
        );
        let config = "[rules.WRONG_INDENTATION]\nalignedParameters = false\n";
        assert_fixed(
            rule,
            config,
            "fun f(a: Int,\n      b: Int) {\n    g()\n}\n",
            "fun f(a: Int,\n    b: Int) {\n    g()\n}\n",
        );
    }

    #[test]
    fn test_indentation_size_option() {
        let config = "[rules.WRONG_INDENTATION]\nindentationSize = 2\n";
        assert_fixed(rule, config, "fun f() {\n    g()\n}\n", "fun f() {\n  g()\n}\n");
    }

    #[test]
    fn test_leading_spaces_on_first_line() {
        assert_fixed(rule, "", "  val a = 1\n", "val a = 1\n");
    }
}
