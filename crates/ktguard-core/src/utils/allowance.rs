//! Comment-based allowance directives.
//!
//! Supports directives like:
//! ```text
//! // ktguard: allow(LONG_LINE) reason="generated table"
//! /* ktguard: allow(all) */
//! ```
//!
//! Directives are read from comment nodes of the syntax tree, so text that
//! only looks like a comment inside a string literal never counts.

use crate::kind::NodeKind;
use crate::tree::{NodeId, SyntaxTree};
use std::collections::HashSet;

/// Result of checking for an allow directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowCheck {
    /// Warning is not allowed.
    Denied,
    /// Warning is allowed with optional reason.
    Allowed {
        /// The reason provided (if any).
        reason: Option<String>,
    },
}

impl AllowCheck {
    /// Returns true if allowed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Returns the reason if allowed.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Allowed { reason } => reason.as_deref(),
            Self::Denied => None,
        }
    }
}

/// Parsed allowance directive.
#[derive(Debug, Clone)]
struct AllowDirective {
    /// Warning names that are allowed (`all` allows every warning).
    names: HashSet<String>,
    reason: Option<String>,
}

impl AllowDirective {
    fn allows(&self, warning: &str) -> bool {
        self.names.contains(warning) || self.names.contains("all")
    }
}

/// Checks the comments on the line holding `offset` and on the line above
/// for a directive that allows `warning`.
///
/// `offset` lies inside `node`.
#[must_use]
pub fn check_allow(tree: &SyntaxTree, node: NodeId, offset: usize, warning: &str) -> AllowCheck {
    let Some(anchor) = anchor_leaf(tree, node, offset) else {
        return AllowCheck::Denied;
    };
    let split = offset.saturating_sub(tree.start_offset(anchor));
    let anchor_text = tree.leaf_text(anchor);
    let (before, after) = match (anchor_text.get(..split), anchor_text.get(split..)) {
        (Some(before), Some(after)) => (before, after),
        _ => (anchor_text, ""),
    };

    let mut candidates = Vec::new();

    // Rest of the line.
    if is_plain_comment(tree, anchor) {
        candidates.push(anchor);
    }
    if !after.contains('\n') {
        let mut current = tree.next_leaf(anchor);
        while let Some(leaf) = current {
            if is_plain_comment(tree, leaf) {
                candidates.push(leaf);
            }
            if tree.leaf_text(leaf).contains('\n') {
                break;
            }
            current = tree.next_leaf(leaf);
        }
    }

    // Start of the line and the line above.
    let mut newlines = before.matches('\n').count();
    let mut current = tree.prev_leaf(anchor);
    while newlines < 2 {
        let Some(leaf) = current else { break };
        if is_plain_comment(tree, leaf) {
            candidates.push(leaf);
        }
        newlines += tree.leaf_text(leaf).matches('\n').count();
        current = tree.prev_leaf(leaf);
    }

    candidates
        .into_iter()
        .filter_map(|leaf| parse_allow_directive(tree.leaf_text(leaf)))
        .find(|directive| directive.allows(warning))
        .map_or(AllowCheck::Denied, |directive| AllowCheck::Allowed {
            reason: directive.reason,
        })
}

/// The last leaf of `node` starting at or before `offset`.
fn anchor_leaf(tree: &SyntaxTree, node: NodeId, offset: usize) -> Option<NodeId> {
    tree.preorder(node)
        .filter(|&n| tree.is_leaf(n))
        .take_while(|&leaf| tree.start_offset(leaf) <= offset)
        .last()
        .or_else(|| tree.first_leaf(node))
}

fn is_plain_comment(tree: &SyntaxTree, leaf: NodeId) -> bool {
    matches!(tree.kind(leaf), NodeKind::EolComment | NodeKind::BlockComment)
}

/// Parses a directive from the text of a comment node.
fn parse_allow_directive(comment: &str) -> Option<AllowDirective> {
    let body = comment
        .strip_prefix("//")
        .map(|c| c.trim_start_matches('/'))
        .or_else(|| comment.strip_prefix("/*").map(|c| c.trim_end_matches("*/")))?
        .trim();

    let directive = body.strip_prefix("ktguard:")?.trim();
    let allow_content = directive.strip_prefix("allow(")?.trim();
    let paren_end = allow_content.find(')')?;

    let names: HashSet<String> = allow_content[..paren_end]
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() {
        return None;
    }

    let rest = allow_content[paren_end + 1..].trim();
    let reason = rest
        .strip_prefix("reason=")
        .map(str::trim)
        .and_then(|r| r.strip_prefix('"'))
        .and_then(|r| r.find('"').map(|end| r[..end].to_string()));

    Some(AllowDirective { names, reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{KotlinParser, SourceParser};

    fn allowed_at(source: &str, identifier: &str, warning: &str) -> AllowCheck {
        let tree = KotlinParser.parse(source).unwrap();
        let node = tree
            .leaves()
            .find(|&n| tree.kind(n) == NodeKind::Identifier && tree.leaf_text(n) == identifier)
            .unwrap();
        check_allow(&tree, node, tree.start_offset(node), warning)
    }

    #[test]
    fn test_parse_allow_directive() {
        let directive = parse_allow_directive("// ktguard: allow(LONG_LINE)").unwrap();
        assert!(directive.names.contains("LONG_LINE"));
        assert!(directive.reason.is_none());
    }

    #[test]
    fn test_parse_directive_with_reason_and_multiple_names() {
        let directive =
            parse_allow_directive("// ktguard: allow(LONG_LINE, WRONG_INDENTATION) reason=\"table\"").unwrap();
        assert!(directive.names.contains("LONG_LINE"));
        assert!(directive.names.contains("WRONG_INDENTATION"));
        assert_eq!(directive.reason.as_deref(), Some("table"));
    }

    #[test]
    fn test_parse_block_comment_directive() {
        assert!(parse_allow_directive("/* ktguard: allow(all) */").is_some());
        assert!(parse_allow_directive("// ktguard: allow()").is_none());
        assert!(parse_allow_directive("// unrelated").is_none());
    }

    #[test]
    fn test_line_and_line_above() {
        let source = "fun f() {\n    // ktguard: allow(LONG_LINE)\n    call()\n    other()\n}\n";
        assert!(allowed_at(source, "call", "LONG_LINE").is_allowed());
        assert!(!allowed_at(source, "other", "LONG_LINE").is_allowed());
        assert!(!allowed_at(source, "f", "LONG_LINE").is_allowed());
        assert!(!allowed_at(source, "call", "WRONG_INDENTATION").is_allowed());
    }

    #[test]
    fn test_trailing_directive() {
        let source = "val x = 1  // ktguard: allow(all)\nval y = 2\n";
        assert!(allowed_at(source, "x", "LONG_LINE").is_allowed());
        assert!(allowed_at(source, "y", "LONG_LINE").is_allowed());
    }

    #[test]
    fn test_blank_line_breaks_directive() {
        let source = "// ktguard: allow(LONG_LINE)\n\nval a = 1\n";
        assert!(!allowed_at(source, "a", "LONG_LINE").is_allowed());
    }

    #[test]
    fn test_directive_inside_string_is_ignored() {
        let source = "val url = \"http://example.com // ktguard: allow(LONG_LINE)\"\n";
        assert_eq!(allowed_at(source, "url", "LONG_LINE"), AllowCheck::Denied);
    }

    #[test]
    fn test_reason() {
        let source = "// ktguard: allow(all) reason=\"legacy\"\nval x = 1\n";
        assert_eq!(allowed_at(source, "x", "LONG_LINE").reason(), Some("legacy"));
    }
}
