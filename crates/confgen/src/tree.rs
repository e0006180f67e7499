//! Arena-backed template tree.
//!
//! Nodes live in a single vector and refer to each other by [`NodeId`]. Each
//! node belongs to an ordered sibling list and may own an ordered child list.
//! The top-level sibling list has no parent. The tree is built once by the
//! template builder and afterwards only pruned with [`Tree::remove`].

use std::fmt::Write;

use crate::template::Declaration;

/// Index of a node inside its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// The three kinds of template node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Literal output text.
    Text(String),
    /// A region emitted only when the named condition is true.
    Conditional { name: String },
    /// A definition record. Never emitted.
    Declaration(Declaration),
}

impl NodeKind {
    /// Returns true for a text node that holds only whitespace.
    pub fn is_whitespace_text(&self) -> bool {
        match self {
            NodeKind::Text(text) => text.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n')),
            NodeKind::Conditional { .. } | NodeKind::Declaration(_) => false,
        }
    }

    /// Returns true for declaration nodes.
    pub fn is_declaration(&self) -> bool {
        matches!(self, NodeKind::Declaration(_))
    }
}

/// A node and its structural links.
#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    line: usize,
    parent: Option<NodeId>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
}

impl Node {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// 1-based template line on which the node started.
    pub fn line(&self) -> usize {
        self.line
    }
}

/// Ordered tree of template nodes.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
    first: Option<NodeId>,
    last: Option<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the top-level sibling list is empty.
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    /// Appends a node to the end of `parent`'s child list, or to the
    /// top-level list when `parent` is `None`.
    pub fn append(&mut self, parent: Option<NodeId>, kind: NodeKind, line: usize) -> NodeId {
        let id = NodeId(self.nodes.len());
        let prev = match parent {
            Some(p) => self.nodes[p.0].last_child,
            None => self.last,
        };
        self.nodes.push(Node {
            kind,
            line,
            parent,
            prev,
            next: None,
            first_child: None,
            last_child: None,
        });
        match prev {
            Some(prev) => self.nodes[prev.0].next = Some(id),
            None => self.set_first(parent, Some(id)),
        }
        self.set_last(parent, Some(id));
        id
    }

    /// Unlinks a node from its sibling list. Its children travel with it and
    /// are no longer reachable from the tree.
    pub fn remove(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[id.0];
            (node.parent, node.prev, node.next)
        };
        match prev {
            Some(prev) => self.nodes[prev.0].next = next,
            None => self.set_first(parent, next),
        }
        match next {
            Some(next) => self.nodes[next.0].prev = prev,
            None => self.set_last(parent, prev),
        }
        let node = &mut self.nodes[id.0];
        node.prev = None;
        node.next = None;
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].next
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].prev
    }

    /// First node of `parent`'s child list, or of the top-level list.
    pub fn first_child(&self, parent: Option<NodeId>) -> Option<NodeId> {
        match parent {
            Some(p) => self.nodes[p.0].first_child,
            None => self.first,
        }
    }

    /// Iterates over `parent`'s children in order.
    pub fn children(&self, parent: Option<NodeId>) -> Siblings<'_> {
        Siblings {
            tree: self,
            next: self.first_child(parent),
        }
    }

    /// Depth-first pre-order walk over every attached node. Children of a node
    /// are visited only when `visitor` returns true for it.
    pub fn visit<E>(
        &self,
        visitor: &mut impl FnMut(NodeId, &Node) -> Result<bool, E>,
    ) -> Result<(), E> {
        self.visit_list(None, visitor)
    }

    fn visit_list<E>(
        &self,
        parent: Option<NodeId>,
        visitor: &mut impl FnMut(NodeId, &Node) -> Result<bool, E>,
    ) -> Result<(), E> {
        for id in self.children(parent) {
            if visitor(id, self.node(id))? {
                self.visit_list(Some(id), visitor)?;
            }
        }
        Ok(())
    }

    /// Renders an indented outline of the tree, one node per line.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.outline_list(None, 0, &mut out);
        out
    }

    fn outline_list(&self, parent: Option<NodeId>, depth: usize, out: &mut String) {
        for id in self.children(parent) {
            let indent = "  ".repeat(depth);
            let _ = match self.kind(id) {
                NodeKind::Text(text) => writeln!(out, "{indent}text {text:?}"),
                NodeKind::Conditional { name } => writeln!(out, "{indent}block {name}"),
                NodeKind::Declaration(decl) => writeln!(out, "{indent}{decl}"),
            };
            self.outline_list(Some(id), depth + 1, out);
        }
    }

    fn set_first(&mut self, parent: Option<NodeId>, id: Option<NodeId>) {
        match parent {
            Some(p) => self.nodes[p.0].first_child = id,
            None => self.first = id,
        }
    }

    fn set_last(&mut self, parent: Option<NodeId>, id: Option<NodeId>) {
        match parent {
            Some(p) => self.nodes[p.0].last_child = id,
            None => self.last = id,
        }
    }
}

/// Iterator over one sibling list.
pub struct Siblings<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Siblings<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}
