//! Rule checking empty blocks and their formatting.
//!
//! Empty blocks are reported unless `allowEmptyBlocks` is set, in which case
//! their style is enforced instead: `{\n}` with `styleEmptyBlockWithNewline`
//! (the default), `{}` without it. Bodies of `override` functions and
//! SAM-constructor lambdas such as `Runnable { }` are exempt. Empty lambdas
//! must not contain line breaks.
//!
//! # Configuration
//!
//! - `allowEmptyBlocks`: allow empty blocks (default: false)
//! - `styleEmptyBlockWithNewline`: require a line break inside allowed empty
//!   blocks (default: true)

use crate::catalog::EMPTY_BLOCK_STRUCTURE_ERROR;
use crate::utils::{is_pascal_case, line_indent};
use ktguard_core::{
    NodeId, NodeKind, Rule, RuleBox, RuleContext, RulesConfig, SyntaxTree, TreeConsistencyError,
    Warning,
};

/// Rule name for empty-block-structure.
pub const NAME: &str = "empty-block-structure";

/// Checks empty blocks.
#[derive(Debug, Clone)]
pub struct EmptyBlock {
    allow_empty_blocks: bool,
    newline_style: bool,
}

impl Default for EmptyBlock {
    fn default() -> Self {
        Self {
            allow_empty_blocks: false,
            newline_style: true,
        }
    }
}

impl EmptyBlock {
    /// Reads the options of `EMPTY_BLOCK_STRUCTURE_ERROR`.
    #[must_use]
    pub fn from_config(config: &RulesConfig) -> Self {
        let defaults = Self::default();
        config
            .get(EMPTY_BLOCK_STRUCTURE_ERROR.name)
            .map_or(defaults.clone(), |entry| Self {
                allow_empty_blocks: entry.get_bool("allowEmptyBlocks", defaults.allow_empty_blocks),
                newline_style: entry.get_bool("styleEmptyBlockWithNewline", defaults.newline_style),
            })
    }

    /// Factory for the rule set.
    #[must_use]
    pub fn boxed(config: &RulesConfig) -> RuleBox {
        Box::new(Self::from_config(config))
    }

    fn check_lambda(
        &self,
        tree: &mut SyntaxTree,
        node: NodeId,
        ctx: &mut RuleContext<'_>,
    ) -> Result<(), TreeConsistencyError> {
        if self.allow_empty_blocks || is_sam_constructor(tree, node) {
            return Ok(());
        }
        let Some(space) = tree
            .children(node)
            .iter()
            .copied()
            .find(|&c| tree.kind(c) == NodeKind::WhiteSpace && tree.leaf_text(c).contains('\n'))
        else {
            return Ok(());
        };
        ctx.warn_and_fix(
            tree,
            &EMPTY_BLOCK_STRUCTURE_ERROR,
            node,
            "do not put newlines in empty lambda",
            |tree| tree.set_leaf_text(space, " "),
        )?;
        Ok(())
    }

    fn check_block(
        &self,
        tree: &mut SyntaxTree,
        node: NodeId,
        ctx: &mut RuleContext<'_>,
    ) -> Result<(), TreeConsistencyError> {
        if is_override_body(tree, node) {
            return Ok(());
        }
        if !self.allow_empty_blocks {
            ctx.warn(
                tree,
                &EMPTY_BLOCK_STRUCTURE_ERROR,
                node,
                "empty blocks are forbidden unless it is function with override keyword",
            );
            return Ok(());
        }
        let Some(close) = tree.find_child(node, NodeKind::RBrace) else {
            return Ok(());
        };
        let space = tree
            .prev_sibling(close)
            .filter(|&s| tree.kind(s) == NodeKind::WhiteSpace);
        let has_newline = space.is_some_and(|s| tree.leaf_text(s).contains('\n'));
        let indent = line_indent(tree, node);

        if self.newline_style && !has_newline {
            ctx.warn_and_fix(tree, &EMPTY_BLOCK_STRUCTURE_ERROR, node, "different style for empty block", |tree| {
                let text = format!("\n{}", " ".repeat(indent));
                match space {
                    Some(space) => tree.set_leaf_text(space, text),
                    None => {
                        let space = tree.new_leaf(NodeKind::WhiteSpace, text);
                        tree.insert_before(close, space)
                    }
                }
            })?;
        } else if !self.newline_style && has_newline {
            ctx.warn_and_fix(tree, &EMPTY_BLOCK_STRUCTURE_ERROR, node, "different style for empty block", |tree| {
                match space {
                    Some(space) => tree.remove(space),
                    None => Ok(()),
                }
            })?;
        }
        Ok(())
    }
}

impl Rule for EmptyBlock {
    fn name(&self) -> &'static str {
        NAME
    }

    fn warnings(&self) -> &'static [&'static Warning] {
        static WARNINGS: [&Warning; 1] = [&EMPTY_BLOCK_STRUCTURE_ERROR];
        &WARNINGS
    }

    fn description(&self) -> &'static str {
        "Checks empty blocks and their formatting"
    }

    fn runs_after(&self) -> &'static [&'static str] {
        &[crate::braces::NAME]
    }

    fn visit_node(
        &self,
        tree: &mut SyntaxTree,
        node: NodeId,
        ctx: &mut RuleContext<'_>,
    ) -> Result<(), TreeConsistencyError> {
        match tree.kind(node) {
            NodeKind::Lambda if is_empty(tree, node) => self.check_lambda(tree, node, ctx),
            NodeKind::Block if is_empty(tree, node) => self.check_block(tree, node, ctx),
            _ => Ok(()),
        }
    }
}

/// Only braces and whitespace.
fn is_empty(tree: &SyntaxTree, node: NodeId) -> bool {
    tree.children(node).iter().all(|&c| {
        matches!(
            tree.kind(c),
            NodeKind::LBrace | NodeKind::RBrace | NodeKind::WhiteSpace
        )
    })
}

fn is_override_body(tree: &SyntaxTree, node: NodeId) -> bool {
    tree.parent(node)
        .filter(|&p| tree.kind(p) == NodeKind::Function)
        .and_then(|function| tree.find_child(function, NodeKind::Modifiers))
        .is_some_and(|modifiers| {
            tree.children(modifiers)
                .iter()
                .any(|&m| tree.kind(m) == NodeKind::Identifier && tree.leaf_text(m) == "override")
        })
}

/// `Runnable { }`: the lambda follows a `PascalCase` name.
fn is_sam_constructor(tree: &SyntaxTree, node: NodeId) -> bool {
    tree.prev_significant_sibling(node).is_some_and(|prev| {
        tree.kind(prev) == NodeKind::Identifier && is_pascal_case(tree.leaf_text(prev))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{assert_fixed, check, run_with};
    use ktguard_core::Mode;

    const ALLOW: &str = "[rules.EMPTY_BLOCK_STRUCTURE_ERROR]\nallowEmptyBlocks = true\n";

    fn rule(config: &RulesConfig) -> RuleBox {
        EmptyBlock::boxed(config)
    }

    #[test]
    fn test_empty_block_is_forbidden() {
        let outcome = check(rule, "fun f() {\n}\n");
        assert_eq!(
            outcome.messages(),
            ["[EMPTY_BLOCK_STRUCTURE_ERROR] incorrect format of empty block: empty blocks are forbidden unless it is function with override keyword"]
        );
        assert_eq!(outcome.offsets(), [8]);
        assert!(!outcome.diagnostics[0].can_be_auto_corrected);
    }

    #[test]
    fn test_override_function_is_exempt() {
        assert!(check(rule, "override fun f() {}\n").diagnostics.is_empty());
    }

    #[test]
    fn test_non_empty_block_passes() {
        assert!(check(rule, "fun f() {\n    // nothing\n}\n").diagnostics.is_empty());
    }

    #[test]
    fn test_allowed_block_gets_newline() {
        assert_fixed(rule, ALLOW, "fun f() {}\n", "fun f() {\n}\n");
        assert_fixed(
            rule,
            ALLOW,
            "class A {\n    fun f() { }\n}\n",
            "class A {\n    fun f() {\n    }\n}\n",
        );
    }

    #[test]
    fn test_allowed_block_without_newline_style() {
        let config = format!("{ALLOW}styleEmptyBlockWithNewline = false\n");
        assert_fixed(rule, &config, "fun f() {\n}\n", "fun f() {}\n");
        assert!(run_with(rule, &config, "fun f() {}\n", Mode::Check)
            .diagnostics
            .is_empty());
    }

    #[test]
    fn test_empty_lambda_newline() {
        assert_fixed(rule, "", "val r = run {\n}\n", "val r = run { }\n");
        assert!(check(rule, "val r = run {}\n").diagnostics.is_empty());
    }

    #[test]
    fn test_sam_constructor_is_exempt() {
        assert!(check(rule, "val r = Runnable {\n}\n").diagnostics.is_empty());
    }
}
