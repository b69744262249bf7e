//! Arena-backed node tree for a parsed YAML document.
//!
//! Nodes are stored in a flat `Vec` and addressed by [`NodeId`]. Code outside
//! the arena holds [`NodeRef`]s, which carry the id of the arena that issued
//! them; resolving a reference against any other arena fails, so references
//! kept past the lifetime of their parse are detected instead of silently
//! pointing at the wrong node.

use crate::yaml::errors::YamlError;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ARENA: AtomicU64 = AtomicU64::new(1);

/// Identity of one parse. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaId(u64);

impl ArenaId {
    fn fresh() -> Self {
        ArenaId(NEXT_ARENA.fetch_add(1, Ordering::Relaxed))
    }
}

/// Index of a node inside its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Weak, checkable reference to a node of a specific arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    arena: ArenaId,
    node: NodeId,
}

/// Source position. Line and column are 1-based, offset is a byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mark {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

impl ScalarStyle {
    pub fn is_block(self) -> bool {
        matches!(self, ScalarStyle::Literal | ScalarStyle::Folded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    pub value: String,
    pub style: ScalarStyle,
}

/// A mapping key. Only scalar keys are supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub text: String,
    pub style: ScalarStyle,
    pub mark: Mark,
    pub end: Mark,
}

/// Comment lines attached to an entry or item.
///
/// `head` holds the full-line comments and blank lines directly above, in
/// source order; blank lines are stored as empty strings. `line` is a
/// trailing `# ...` on the node's own line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments {
    pub head: Vec<String>,
    pub line: Option<String>,
}

impl Comments {
    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.line.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Key,
    pub value: NodeId,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub value: NodeId,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Mapping { entries: Vec<Entry>, flow: bool },
    Sequence { items: Vec<Item>, flow: bool },
    Scalar(Scalar),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    /// Start of the node's first token
    pub mark: Mark,
    /// End of the node's last token
    pub end: Mark,
}

impl Node {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match &self.kind {
            NodeKind::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn is_block_collection(&self) -> bool {
        match &self.kind {
            NodeKind::Mapping { entries, flow } => !flow && !entries.is_empty(),
            NodeKind::Sequence { items, flow } => !flow && !items.is_empty(),
            NodeKind::Scalar(_) => false,
        }
    }
}

/// Document root: the arena plus the optional body node and the comments
/// that trail the last node.
#[derive(Debug, Clone)]
pub struct Document {
    arena: ArenaId,
    nodes: Vec<Node>,
    root: Option<NodeId>,
    pub(crate) foot_comments: Vec<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            arena: ArenaId::fresh(),
            nodes: Vec::new(),
            root: None,
            foot_comments: Vec::new(),
        }
    }

    pub fn arena(&self) -> ArenaId {
        self.arena
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn foot_comments(&self) -> &[String] {
        &self.foot_comments
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Panics on an id from another arena; ids never leave the crate bare.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn reference(&self, id: NodeId) -> NodeRef {
        NodeRef {
            arena: self.arena,
            node: id,
        }
    }

    /// Turn a reference back into an id, rejecting references from other
    /// (discarded or re-parsed) arenas.
    pub fn resolve(&self, node: NodeRef) -> Result<NodeId, YamlError> {
        if node.arena != self.arena || node.node.0 >= self.nodes.len() {
            return Err(YamlError::StaleReference);
        }
        Ok(node.node)
    }

    pub fn scalar(&self, node: NodeRef) -> Result<&Scalar, YamlError> {
        let id = self.resolve(node)?;
        self.node(id).as_scalar().ok_or_else(|| {
            YamlError::validation("referenced node is not a scalar value")
        })
    }

    /// Replace the text and style of a scalar node.
    pub fn set_scalar(
        &mut self,
        node: NodeRef,
        value: impl Into<String>,
        style: ScalarStyle,
    ) -> Result<(), YamlError> {
        let id = self.resolve(node)?;
        match &mut self.node_mut(id).kind {
            NodeKind::Scalar(scalar) => {
                scalar.value = value.into();
                scalar.style = style;
                Ok(())
            }
            _ => Err(YamlError::validation(
                "referenced node is not a scalar value",
            )),
        }
    }

    /// Number of nodes in the subtree rooted at `id`, `id` included.
    pub(crate) fn subtree_len(&self, id: NodeId) -> usize {
        let mut count = 0;
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            count += 1;
            match &self.node(next).kind {
                NodeKind::Mapping { entries, .. } => {
                    pending.extend(entries.iter().map(|entry| entry.value));
                }
                NodeKind::Sequence { items, .. } => {
                    pending.extend(items.iter().map(|item| item.value));
                }
                NodeKind::Scalar(_) => {}
            }
        }
        count
    }

    /// Copy the subtree rooted at `id` into fresh nodes of this arena.
    /// Used to expand aliases.
    pub(crate) fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let node = self.node(id).clone();
        let kind = match node.kind {
            NodeKind::Mapping { entries, flow } => {
                let entries = entries
                    .into_iter()
                    .map(|entry| Entry {
                        value: self.deep_copy(entry.value),
                        key: entry.key,
                        comments: Comments::default(),
                    })
                    .collect();
                NodeKind::Mapping { entries, flow }
            }
            NodeKind::Sequence { items, flow } => {
                let items = items
                    .into_iter()
                    .map(|item| Item {
                        value: self.deep_copy(item.value),
                        comments: Comments::default(),
                    })
                    .collect();
                NodeKind::Sequence { items, flow }
            }
            scalar @ NodeKind::Scalar(_) => scalar,
        };
        self.push(Node {
            kind,
            mark: node.mark,
            end: node.end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_node(value: &str) -> Node {
        Node {
            kind: NodeKind::Scalar(Scalar {
                value: value.to_string(),
                style: ScalarStyle::Plain,
            }),
            mark: Mark::default(),
            end: Mark::default(),
        }
    }

    #[test]
    fn subtree_len_counts_descendants() {
        let mut doc = Document::new();
        let first = doc.push(scalar_node("a"));
        let second = doc.push(scalar_node("b"));
        let list = doc.push(Node {
            kind: NodeKind::Sequence {
                items: vec![
                    Item {
                        value: first,
                        comments: Comments::default(),
                    },
                    Item {
                        value: second,
                        comments: Comments::default(),
                    },
                ],
                flow: true,
            },
            mark: Mark::default(),
            end: Mark::default(),
        });
        assert_eq!(doc.subtree_len(list), 3);
        assert_eq!(doc.subtree_len(first), 1);
    }

    #[test]
    fn references_from_other_arenas_are_stale() {
        let mut first = Document::new();
        let id = first.push(scalar_node("v1"));
        let reference = first.reference(id);

        let mut second = Document::new();
        second.push(scalar_node("v1"));

        assert!(first.resolve(reference).is_ok());
        assert_eq!(second.resolve(reference), Err(YamlError::StaleReference));
    }

    #[test]
    fn set_scalar_updates_value_and_style() {
        let mut doc = Document::new();
        let id = doc.push(scalar_node("v1"));
        let reference = doc.reference(id);

        doc.set_scalar(reference, "v2", ScalarStyle::DoubleQuoted)
            .unwrap();
        let scalar = doc.scalar(reference).unwrap();
        assert_eq!(scalar.value, "v2");
        assert_eq!(scalar.style, ScalarStyle::DoubleQuoted);
    }

    #[test]
    fn deep_copy_creates_independent_nodes() {
        let mut doc = Document::new();
        let leaf = doc.push(scalar_node("x"));
        let seq = doc.push(Node {
            kind: NodeKind::Sequence {
                items: vec![Item {
                    value: leaf,
                    comments: Comments::default(),
                }],
                flow: false,
            },
            mark: Mark::default(),
            end: Mark::default(),
        });

        let copy = doc.deep_copy(seq);
        assert_ne!(copy, seq);
        assert_eq!(doc.len(), 4);
        match &doc.node(copy).kind {
            NodeKind::Sequence { items, .. } => assert_ne!(items[0].value, leaf),
            other => panic!("unexpected node: {other:?}"),
        }
    }
}
