//! Arena-backed, mutable syntax tree.
//!
//! Nodes live in a single arena and are addressed by [`NodeId`]. Ids stay
//! valid for the lifetime of the tree: removing a node only detaches it, so a
//! rule holding an id of a node removed by an earlier fix can detect that with
//! [`SyntaxTree::is_attached`] instead of dereferencing freed memory.
//!
//! Leaves own their text; the text of a composite node is the concatenation of
//! the leaves below it, so serializing the root reproduces the source exactly.

use crate::kind::NodeKind;
use std::fmt;
use thiserror::Error;

/// Stable handle to a node inside a [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Violated structural invariant of a [`SyntaxTree`] mutation.
///
/// These are programming errors in a rule, not properties of the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeConsistencyError {
    /// The node is not listed among its parent's children.
    #[error("node {node} is not a child of {parent}")]
    NotAChild {
        /// Offending node.
        node: NodeId,
        /// Claimed parent.
        parent: NodeId,
    },

    /// The operation needs an attached node.
    #[error("node {0} is detached from the tree")]
    Detached(NodeId),

    /// Inserted nodes must be detached first.
    #[error("node {0} is already attached; remove it before inserting")]
    AlreadyAttached(NodeId),

    /// The insertion would place a node inside its own subtree.
    #[error("inserting node {node} under {target} would create a cycle")]
    Cycle {
        /// Node being inserted.
        node: NodeId,
        /// Insertion target.
        target: NodeId,
    },

    /// Text can only be assigned to leaves.
    #[error("node {0} is composite and has no own text")]
    NotALeaf(NodeId),

    /// Children can only be added to composite nodes.
    #[error("node {0} is a leaf and cannot have children")]
    NotAComposite(NodeId),

    /// The root cannot be moved, replaced or removed.
    #[error("the root node cannot be moved, replaced or removed")]
    RootMutation,

    /// The id was not issued by this tree.
    #[error("node {0} does not belong to this tree")]
    UnknownNode(NodeId),

    /// Construction finished with open or missing nodes.
    #[error("unbalanced tree construction")]
    Unbalanced,
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    text: String,
    start_offset: usize,
    synthesized: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Mutable syntax tree of one source file.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl SyntaxTree {
    /// Returns the root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    fn ensure_known(&self, id: NodeId) -> Result<(), TreeConsistencyError> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(TreeConsistencyError::UnknownNode(id))
        }
    }

    // ── Navigation ──

    /// Kind of the node.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by another tree.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.data(id).kind
    }

    /// Own text of a leaf; empty for composite nodes.
    #[must_use]
    pub fn leaf_text(&self, id: NodeId) -> &str {
        &self.data(id).text
    }

    /// Full text of the node's subtree.
    #[must_use]
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_text(id, &mut out);
        out
    }

    fn write_text(&self, id: NodeId, out: &mut String) {
        let data = self.data(id);
        if data.kind.is_composite() {
            for &child in &data.children {
                self.write_text(child, out);
            }
        } else {
            out.push_str(&data.text);
        }
    }

    /// Serializes the whole tree back to source text.
    #[must_use]
    pub fn to_source(&self) -> String {
        self.text(self.root)
    }

    /// Offset of the node in the original source.
    ///
    /// Nodes created by a fix report the offset of the position they were
    /// inserted at.
    #[must_use]
    pub fn start_offset(&self, id: NodeId) -> usize {
        self.data(id).start_offset
    }

    /// Returns `true` for leaves.
    #[must_use]
    pub fn is_leaf(&self, id: NodeId) -> bool {
        !self.data(id).kind.is_composite()
    }

    /// Parent of the node, `None` for the root and for detached nodes.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    /// Children in source order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    /// First child of the given kind.
    #[must_use]
    pub fn find_child(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&child| self.kind(child) == kind)
    }

    /// Children that are not whitespace or comments.
    pub fn significant_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&child| !self.kind(child).is_trivia())
    }

    fn position(&self, parent: NodeId, node: NodeId) -> Result<usize, TreeConsistencyError> {
        self.children(parent)
            .iter()
            .position(|&child| child == node)
            .ok_or(TreeConsistencyError::NotAChild { node, parent })
    }

    /// Sibling immediately before the node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.position(parent, id).ok()?;
        index
            .checked_sub(1)
            .map(|prev| self.children(parent)[prev])
    }

    /// Sibling immediately after the node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.position(parent, id).ok()?;
        self.children(parent).get(index + 1).copied()
    }

    /// Closest preceding sibling that is not trivia.
    #[must_use]
    pub fn prev_significant_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.prev_sibling(id);
        while let Some(node) = current {
            if !self.kind(node).is_trivia() {
                return Some(node);
            }
            current = self.prev_sibling(node);
        }
        None
    }

    /// Closest following sibling that is not trivia.
    #[must_use]
    pub fn next_significant_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.next_sibling(id);
        while let Some(node) = current {
            if !self.kind(node).is_trivia() {
                return Some(node);
            }
            current = self.next_sibling(node);
        }
        None
    }

    /// First leaf of the subtree.
    #[must_use]
    pub fn first_leaf(&self, id: NodeId) -> Option<NodeId> {
        if self.is_leaf(id) {
            return Some(id);
        }
        self.children(id)
            .iter()
            .find_map(|&child| self.first_leaf(child))
    }

    /// Last leaf of the subtree.
    #[must_use]
    pub fn last_leaf(&self, id: NodeId) -> Option<NodeId> {
        if self.is_leaf(id) {
            return Some(id);
        }
        self.children(id)
            .iter()
            .rev()
            .find_map(|&child| self.last_leaf(child))
    }

    /// Leaf preceding the node in document order.
    #[must_use]
    pub fn prev_leaf(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let mut sibling = self.prev_sibling(current);
            while let Some(node) = sibling {
                if let Some(leaf) = self.last_leaf(node) {
                    return Some(leaf);
                }
                sibling = self.prev_sibling(node);
            }
            current = self.parent(current)?;
        }
    }

    /// Leaf following the node in document order.
    #[must_use]
    pub fn next_leaf(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let mut sibling = self.next_sibling(current);
            while let Some(node) = sibling {
                if let Some(leaf) = self.first_leaf(node) {
                    return Some(leaf);
                }
                sibling = self.next_sibling(node);
            }
            current = self.parent(current)?;
        }
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&node| self.parent(node))
    }

    /// Returns `true` if the node is reachable from the root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|node| node == self.root)
    }

    // ── Traversal ──

    /// Lazy pre-order iterator over the node's descendants (excluding itself).
    ///
    /// The iterator reads the tree as it is when each step runs; calling
    /// this again after a mutation sees the new structure.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { tree: self, stack }
    }

    /// Pre-order iterator over the node and its descendants.
    pub fn preorder(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(id).chain(self.descendants(id))
    }

    /// Descendants matching `predicate`, in pre-order.
    pub fn find_descendants<'a, P>(
        &'a self,
        id: NodeId,
        mut predicate: P,
    ) -> impl Iterator<Item = NodeId> + 'a
    where
        P: FnMut(&SyntaxTree, NodeId) -> bool + 'a,
    {
        self.descendants(id)
            .filter(move |&node| predicate(self, node))
    }

    /// Leaves of the whole tree in document order.
    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.preorder(self.root).filter(move |&node| self.is_leaf(node))
    }

    // ── Construction ──

    /// Allocates a detached leaf.
    pub fn new_leaf(&mut self, kind: NodeKind, text: impl Into<String>) -> NodeId {
        self.alloc(kind, text.into(), 0, true)
    }

    /// Allocates a detached composite node without children.
    pub fn new_composite(&mut self, kind: NodeKind) -> NodeId {
        self.alloc(kind, String::new(), 0, true)
    }

    fn alloc(&mut self, kind: NodeKind, text: String, offset: usize, synthesized: bool) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(NodeData {
            kind,
            text,
            start_offset: offset,
            synthesized,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    // ── Mutation ──

    fn check_insertable(&self, node: NodeId, target: NodeId) -> Result<(), TreeConsistencyError> {
        self.ensure_known(node)?;
        self.ensure_known(target)?;
        if node == self.root {
            return Err(TreeConsistencyError::RootMutation);
        }
        if self.parent(node).is_some() {
            return Err(TreeConsistencyError::AlreadyAttached(node));
        }
        if target == node || self.ancestors(target).any(|a| a == node) {
            return Err(TreeConsistencyError::Cycle { node, target });
        }
        Ok(())
    }

    fn attached_parent(&self, node: NodeId) -> Result<NodeId, TreeConsistencyError> {
        self.ensure_known(node)?;
        if node == self.root {
            return Err(TreeConsistencyError::RootMutation);
        }
        self.parent(node).ok_or(TreeConsistencyError::Detached(node))
    }

    fn adopt_offset(&mut self, node: NodeId, offset: usize) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let data = self.data_mut(current);
            if data.synthesized {
                data.start_offset = offset;
            }
            stack.extend(data.children.iter().copied());
        }
    }

    /// Appends a detached node as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Fails if `parent` is a leaf, `child` is attached, or the append would
    /// create a cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeConsistencyError> {
        self.check_insertable(child, parent)?;
        if self.is_leaf(parent) {
            return Err(TreeConsistencyError::NotAComposite(parent));
        }
        let offset = self
            .children(parent)
            .last()
            .map_or(self.start_offset(parent), |&last| self.start_offset(last));
        self.data_mut(parent).children.push(child);
        self.data_mut(child).parent = Some(parent);
        self.adopt_offset(child, offset);
        Ok(())
    }

    /// Inserts a detached node right before `anchor`.
    ///
    /// # Errors
    ///
    /// Fails if `anchor` is detached or `node` cannot be inserted.
    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) -> Result<(), TreeConsistencyError> {
        let parent = self.attached_parent(anchor)?;
        self.check_insertable(node, parent)?;
        let index = self.position(parent, anchor)?;
        self.link(parent, index, node, self.start_offset(anchor));
        Ok(())
    }

    /// Inserts a detached node right after `anchor`.
    ///
    /// # Errors
    ///
    /// Fails if `anchor` is detached or `node` cannot be inserted.
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> Result<(), TreeConsistencyError> {
        let parent = self.attached_parent(anchor)?;
        self.check_insertable(node, parent)?;
        let index = self.position(parent, anchor)?;
        self.link(parent, index + 1, node, self.start_offset(anchor));
        Ok(())
    }

    fn link(&mut self, parent: NodeId, index: usize, node: NodeId, offset: usize) {
        self.data_mut(parent).children.insert(index, node);
        self.data_mut(node).parent = Some(parent);
        self.adopt_offset(node, offset);
    }

    /// Replaces `old` with the detached node `new`; `old` becomes detached.
    ///
    /// # Errors
    ///
    /// Fails if `old` is detached or the root, or `new` cannot be inserted.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), TreeConsistencyError> {
        let parent = self.attached_parent(old)?;
        self.check_insertable(new, parent)?;
        let index = self.position(parent, old)?;
        self.data_mut(parent).children[index] = new;
        self.data_mut(old).parent = None;
        self.data_mut(new).parent = Some(parent);
        let offset = self.start_offset(old);
        self.adopt_offset(new, offset);
        Ok(())
    }

    /// Detaches the node from its parent.
    ///
    /// # Errors
    ///
    /// Fails if the node is already detached or is the root.
    pub fn remove(&mut self, node: NodeId) -> Result<(), TreeConsistencyError> {
        let parent = self.attached_parent(node)?;
        let index = self.position(parent, node)?;
        self.data_mut(parent).children.remove(index);
        self.data_mut(node).parent = None;
        Ok(())
    }

    /// Replaces the text of a leaf.
    ///
    /// # Errors
    ///
    /// Fails for composite nodes.
    pub fn set_leaf_text(&mut self, leaf: NodeId, text: impl Into<String>) -> Result<(), TreeConsistencyError> {
        self.ensure_known(leaf)?;
        if !self.is_leaf(leaf) {
            return Err(TreeConsistencyError::NotALeaf(leaf));
        }
        self.data_mut(leaf).text = text.into();
        Ok(())
    }

    /// Renders the subtree as an indented outline, one node per line.
    #[must_use]
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_into(id, 0, &mut out);
        out
    }

    fn dump_into(&self, id: NodeId, depth: usize, out: &mut String) {
        use std::fmt::Write;
        let indent = "  ".repeat(depth);
        if self.is_leaf(id) {
            let _ = writeln!(out, "{indent}{} {:?}", self.kind(id), self.leaf_text(id));
        } else {
            let _ = writeln!(out, "{indent}{}", self.kind(id));
            for &child in self.children(id) {
                self.dump_into(child, depth + 1, out);
            }
        }
    }
}

/// Lazy pre-order traversal created by [`SyntaxTree::descendants`].
pub struct Descendants<'a> {
    tree: &'a SyntaxTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(node).iter().rev().copied());
        Some(node)
    }
}

/// Incremental builder used by parsers.
///
/// Leaves are appended in source order and receive consecutive offsets.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
    stack: Vec<NodeId>,
    offset: usize,
}

impl TreeBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current source offset.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn push(&mut self, kind: NodeKind, text: String) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        let parent = self.stack.last().copied();
        self.nodes.push(NodeData {
            kind,
            text,
            start_offset: self.offset,
            synthesized: false,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(id);
        }
        id
    }

    /// Opens a composite node; subsequent nodes become its children.
    pub fn start_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.push(kind, String::new());
        self.stack.push(id);
        id
    }

    /// Appends a leaf to the currently open node.
    pub fn token(&mut self, kind: NodeKind, text: &str) -> NodeId {
        let id = self.push(kind, text.to_string());
        self.offset += text.len();
        id
    }

    /// Closes the most recently opened composite node.
    pub fn finish_node(&mut self) {
        self.stack.pop();
    }

    /// Finishes construction.
    ///
    /// # Errors
    ///
    /// Fails if no node was created or some node was left open.
    pub fn finish(self) -> Result<SyntaxTree, TreeConsistencyError> {
        if self.nodes.is_empty() || !self.stack.is_empty() {
            return Err(TreeConsistencyError::Unbalanced);
        }
        Ok(SyntaxTree {
            nodes: self.nodes,
            root: NodeId(0),
        })
    }
}
