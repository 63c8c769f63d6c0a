//! Tree helpers shared by the rules.

use ktguard_core::{NodeId, NodeKind, SyntaxTree, TreeConsistencyError};

/// Leading spaces of the line the node starts on, in the current tree.
pub fn line_indent(tree: &SyntaxTree, node: NodeId) -> usize {
    let Some(first) = tree.first_leaf(node) else {
        return 0;
    };
    let mut current = tree.prev_leaf(first);
    while let Some(leaf) = current {
        let text = tree.leaf_text(leaf);
        if let Some(pos) = text.rfind('\n') {
            return text[pos + 1..].chars().take_while(|&c| c == ' ').count();
        }
        current = tree.prev_leaf(leaf);
    }
    0
}

/// First leaf on the line the leaf belongs to.
pub fn line_start_leaf(tree: &SyntaxTree, leaf: NodeId) -> NodeId {
    let mut start = leaf;
    while let Some(prev) = tree.prev_leaf(start) {
        if ends_line(tree, prev) {
            break;
        }
        start = prev;
    }
    start
}

/// Returns `true` if the leaf is whitespace containing a line break.
pub fn ends_line(tree: &SyntaxTree, leaf: NodeId) -> bool {
    tree.kind(leaf) == NodeKind::WhiteSpace && tree.leaf_text(leaf).contains('\n')
}

/// The last leaf starting at or before `offset`.
pub fn leaf_at(tree: &SyntaxTree, offset: usize) -> NodeId {
    tree.leaves()
        .take_while(|&leaf| tree.start_offset(leaf) <= offset)
        .last()
        .unwrap_or_else(|| tree.root())
}

/// Wraps `node` in a new block:
///
/// ```text
/// {
///     <node>
/// }
/// ```
///
/// The block is indented relative to `indent`.
pub fn wrap_in_block(
    tree: &mut SyntaxTree,
    node: NodeId,
    indent: usize,
    step: usize,
) -> Result<NodeId, TreeConsistencyError> {
    let block = tree.new_composite(NodeKind::Block);
    tree.replace(node, block)?;
    let open = tree.new_leaf(NodeKind::LBrace, "{");
    tree.append_child(block, open)?;
    let before = tree.new_leaf(NodeKind::WhiteSpace, format!("\n{}", " ".repeat(indent + step)));
    tree.append_child(block, before)?;
    tree.append_child(block, node)?;
    let after = tree.new_leaf(NodeKind::WhiteSpace, format!("\n{}", " ".repeat(indent)));
    tree.append_child(block, after)?;
    let close = tree.new_leaf(NodeKind::RBrace, "}");
    tree.append_child(block, close)?;
    Ok(block)
}

/// Creates a detached `kind` node holding an empty block `{\n<indent>}`.
pub fn empty_block_in(
    tree: &mut SyntaxTree,
    kind: NodeKind,
    indent: usize,
) -> Result<NodeId, TreeConsistencyError> {
    let wrapper = tree.new_composite(kind);
    let block = tree.new_composite(NodeKind::Block);
    tree.append_child(wrapper, block)?;
    let open = tree.new_leaf(NodeKind::LBrace, "{");
    tree.append_child(block, open)?;
    let space = tree.new_leaf(NodeKind::WhiteSpace, format!("\n{}", " ".repeat(indent)));
    tree.append_child(block, space)?;
    let close = tree.new_leaf(NodeKind::RBrace, "}");
    tree.append_child(block, close)?;
    Ok(wrapper)
}

/// Inserts `nodes` after `anchor`, in order.
pub fn insert_all_after(
    tree: &mut SyntaxTree,
    anchor: NodeId,
    nodes: &[NodeId],
) -> Result<(), TreeConsistencyError> {
    let mut previous = anchor;
    for &node in nodes {
        tree.insert_after(previous, node)?;
        previous = node;
    }
    Ok(())
}

/// Text of the node without comments.
pub fn text_without_comments(tree: &SyntaxTree, node: NodeId) -> String {
    tree.preorder(node)
        .filter(|&n| tree.is_leaf(n) && !tree.kind(n).is_comment())
        .map(|n| tree.leaf_text(n))
        .collect()
}

/// Returns `true` if the text is `PascalCase`.
pub fn is_pascal_case(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && text.chars().all(char::is_alphanumeric)
        && text.chars().any(char::is_lowercase)
}
