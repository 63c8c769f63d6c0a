//! Rule limiting function length.
//!
//! Non-blank lines are counted after dropping comments, either for the whole
//! declaration or for the body alone.
//!
//! # Configuration
//!
//! - `maxFunctionLength`: maximum number of lines (default: 30)
//! - `isIncludeHeader`: count annotations and the signature too (default: true)

use crate::catalog::TOO_LONG_FUNCTION;
use crate::utils::text_without_comments;
use ktguard_core::{
    NodeId, NodeKind, Rule, RuleBox, RuleContext, RulesConfig, SyntaxTree, TreeConsistencyError,
    Warning,
};

/// Rule name for function-length.
pub const NAME: &str = "function-length";

const MAX_FUNCTION_LENGTH: usize = 30;

/// Reports functions longer than `maxFunctionLength` lines.
#[derive(Debug, Clone)]
pub struct FunctionLength {
    max_function_length: usize,
    include_header: bool,
}

impl Default for FunctionLength {
    fn default() -> Self {
        Self {
            max_function_length: MAX_FUNCTION_LENGTH,
            include_header: true,
        }
    }
}

impl FunctionLength {
    /// Reads the options of `TOO_LONG_FUNCTION`.
    #[must_use]
    pub fn from_config(config: &RulesConfig) -> Self {
        let mut rule = Self::default();
        if let Some(entry) = config.get(TOO_LONG_FUNCTION.name) {
            rule.max_function_length = entry.get_usize("maxFunctionLength", MAX_FUNCTION_LENGTH);
            rule.include_header = entry.get_bool("isIncludeHeader", true);
        }
        rule
    }

    /// Factory for the rule set.
    #[must_use]
    pub fn boxed(config: &RulesConfig) -> RuleBox {
        Box::new(Self::from_config(config))
    }

    fn counted_text(&self, tree: &SyntaxTree, function: NodeId) -> Option<String> {
        if self.include_header {
            return Some(text_without_comments(tree, function));
        }
        if let Some(block) = tree.find_child(function, NodeKind::Block) {
            return Some(text_without_comments(tree, block));
        }
        let children = tree.children(function);
        let assign = children
            .iter()
            .position(|&c| tree.kind(c) == NodeKind::Operator && tree.leaf_text(c) == "=")?;
        Some(
            children[assign + 1..]
                .iter()
                .map(|&c| text_without_comments(tree, c))
                .collect(),
        )
    }
}

impl Rule for FunctionLength {
    fn name(&self) -> &'static str {
        NAME
    }

    fn warnings(&self) -> &'static [&'static Warning] {
        static WARNINGS: [&Warning; 1] = [&TOO_LONG_FUNCTION];
        &WARNINGS
    }

    fn description(&self) -> &'static str {
        "Limits the number of lines in a function"
    }

    fn visit_node(
        &self,
        tree: &mut SyntaxTree,
        node: NodeId,
        ctx: &mut RuleContext<'_>,
    ) -> Result<(), TreeConsistencyError> {
        if tree.kind(node) != NodeKind::Function {
            return Ok(());
        }
        let Some(text) = self.counted_text(tree, node) else {
            return Ok(());
        };
        let lines = text.lines().filter(|l| !l.trim().is_empty()).count();
        if lines > self.max_function_length {
            let message = format!("max length is {}, but you have {lines}", self.max_function_length);
            ctx.warn(tree, &TOO_LONG_FUNCTION, node, &message);
        }
        Ok(())
    }
}
