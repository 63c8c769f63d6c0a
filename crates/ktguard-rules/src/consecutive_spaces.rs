//! Rule squeezing runs of spaces inside a line.
//!
//! Indentation, line breaks and the padding before an end-of-line comment
//! are left alone.
//!
//! # Configuration
//!
//! - `maxSpaces`: longest allowed run of spaces (default: 1)

use crate::catalog::TOO_MANY_CONSECUTIVE_SPACES;
use ktguard_core::{
    NodeId, NodeKind, Rule, RuleBox, RuleContext, RulesConfig, SyntaxTree, TreeConsistencyError,
    Warning,
};

/// Rule name for consecutive-spaces.
pub const NAME: &str = "consecutive-spaces";

/// Reports runs of spaces longer than `maxSpaces`.
#[derive(Debug, Clone)]
pub struct ConsecutiveSpaces {
    max_spaces: usize,
}

impl Default for ConsecutiveSpaces {
    fn default() -> Self {
        Self { max_spaces: 1 }
    }
}

impl ConsecutiveSpaces {
    /// Reads the options of `TOO_MANY_CONSECUTIVE_SPACES`.
    #[must_use]
    pub fn from_config(config: &RulesConfig) -> Self {
        let mut rule = Self::default();
        if let Some(entry) = config.get(TOO_MANY_CONSECUTIVE_SPACES.name) {
            rule.max_spaces = entry.get_usize("maxSpaces", rule.max_spaces).max(1);
        }
        rule
    }

    /// Factory for the rule set.
    #[must_use]
    pub fn boxed(config: &RulesConfig) -> RuleBox {
        Box::new(Self::from_config(config))
    }
}

impl Rule for ConsecutiveSpaces {
    fn name(&self) -> &'static str {
        NAME
    }

    fn warnings(&self) -> &'static [&'static Warning] {
        static WARNINGS: [&Warning; 1] = [&TOO_MANY_CONSECUTIVE_SPACES];
        &WARNINGS
    }

    fn description(&self) -> &'static str {
        "Squeezes consecutive spaces between tokens"
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
        if tree.kind(node) != NodeKind::WhiteSpace {
            return Ok(());
        }
        let text = tree.leaf_text(node);
        let spaces = text.len();
        if spaces <= self.max_spaces || !text.chars().all(|c| c == ' ') {
            return Ok(());
        }
        // Start of file is indentation; padding before `//` is alignment.
        if tree.prev_leaf(node).is_none()
            || tree
                .next_leaf(node)
                .is_some_and(|next| tree.kind(next) == NodeKind::EolComment)
        {
            return Ok(());
        }
        let message = format!("found: {spaces}. need to be: {}", self.max_spaces);
        ctx.warn_and_fix(tree, &TOO_MANY_CONSECUTIVE_SPACES, node, &message, |tree| {
            tree.set_leaf_text(node, " ")
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{assert_fixed, check};

    fn rule(config: &RulesConfig) -> RuleBox {
        ConsecutiveSpaces::boxed(config)
    }

    #[test]
    fn test_spaces_are_squeezed() {
        let outcome = check(rule, "val  a =   1\n");
        assert_eq!(
            outcome.messages(),
            [
                "[TOO_MANY_CONSECUTIVE_SPACES] too many consecutive spaces: found: 2. need to be: 1",
                "[TOO_MANY_CONSECUTIVE_SPACES] too many consecutive spaces: found: 3. need to be: 1",
            ]
        );
        assert_eq!(outcome.offsets(), [3, 8]);
        assert_fixed(rule, "", "val  a =   1\n", "val a = 1\n");
    }

    #[test]
    fn test_indentation_and_comments_are_kept() {
        let source = "fun f() {\n        g()   // note\n}\n";
        assert!(check(rule, source).diagnostics.is_empty());
    }

    #[test]
    fn test_max_spaces_option() {
        let config = "[rules.TOO_MANY_CONSECUTIVE_SPACES]\nmaxSpaces = 2\n";
        assert_fixed(rule, config, "val  a =   1\n", "val  a = 1\n");
    }

    #[test]
    fn test_string_content_is_not_whitespace() {
        assert!(check(rule, "val s = \"a    b\"\n").diagnostics.is_empty());
    }
}
