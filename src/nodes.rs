//! The node graph produced by the composer and consumed by the serializer.
//!
//! Nodes live in a per-document [`NodeArena`] and refer to each other by
//! [`NodeId`]. Aliasing and self-reference are plain index copies, so cyclic
//! documents need no ownership cycles. Node identity (the id), not
//! structural equality, is what anchors and aliases track.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::mark::Span;
use crate::style::{FlowStyle, ScalarStyle};

/// Prefix of the YAML global tags.
pub const TAG_PREFIX: &str = "tag:yaml.org,2002:";

/// An absolute tag identifier. Equality is value equality on the
/// normalized string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Tag(Arc<str>);

impl Tag {
    pub fn new(value: impl AsRef<str>) -> Self {
        Tag(value.as_ref().into())
    }

    /// A standard tag, e.g. `standard("str")` for `tag:yaml.org,2002:str`.
    pub fn standard(kind: &str) -> Self {
        Tag(format!("{}{}", TAG_PREFIX, kind).into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    /// Whether this is one of the `tag:yaml.org,2002:` tags.
    pub fn is_global(&self) -> bool {
        self.0.starts_with(TAG_PREFIX)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.0)
    }
}

/// The standard tags.
pub mod tag {
    use super::*;

    pub static NULL: Lazy<Tag> = Lazy::new(|| Tag::standard("null"));
    pub static BOOL: Lazy<Tag> = Lazy::new(|| Tag::standard("bool"));
    pub static INT: Lazy<Tag> = Lazy::new(|| Tag::standard("int"));
    pub static FLOAT: Lazy<Tag> = Lazy::new(|| Tag::standard("float"));
    pub static STR: Lazy<Tag> = Lazy::new(|| Tag::standard("str"));
    pub static SEQ: Lazy<Tag> = Lazy::new(|| Tag::standard("seq"));
    pub static MAP: Lazy<Tag> = Lazy::new(|| Tag::standard("map"));
}

/// Index of a node within its document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// Comments attached to a node when comment parsing is enabled.
#[derive(Debug, Clone, Default)]
pub struct NodeComments {
    /// Comment lines on their own lines before the node.
    pub block: Vec<String>,
    /// Comment trailing the node on the same line.
    pub inline: Option<String>,
}

/// Content of a node.
#[derive(Debug, Clone)]
pub enum NodeData {
    Scalar {
        value: String,
        style: ScalarStyle,
    },
    Sequence {
        items: Vec<NodeId>,
        flow: FlowStyle,
    },
    Mapping {
        entries: Vec<(NodeId, NodeId)>,
        flow: FlowStyle,
    },
}

/// One node of the graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub tag: Tag,
    pub data: NodeData,
    pub span: Option<Span>,
    /// True iff the node is reachable from itself through its own
    /// descendants. Set by the composer; consumers needing two-phase
    /// construction defer population of such nodes.
    pub recursive: bool,
    /// True when the tag was assigned by the resolver rather than written
    /// explicitly.
    pub resolved: bool,
    /// Hint for a pluggable constructor; `None` means "any".
    pub native_hint: Option<String>,
    pub comments: Option<Box<NodeComments>>,
}

impl Node {
    pub fn scalar(tag: Tag, value: impl Into<String>, style: ScalarStyle) -> Self {
        Node {
            tag,
            data: NodeData::Scalar {
                value: value.into(),
                style,
            },
            span: None,
            recursive: false,
            resolved: true,
            native_hint: None,
            comments: None,
        }
    }

    pub fn sequence(tag: Tag, items: Vec<NodeId>, flow: FlowStyle) -> Self {
        Node {
            tag,
            data: NodeData::Sequence { items, flow },
            span: None,
            recursive: false,
            resolved: true,
            native_hint: None,
            comments: None,
        }
    }

    pub fn mapping(tag: Tag, entries: Vec<(NodeId, NodeId)>, flow: FlowStyle) -> Self {
        Node {
            tag,
            data: NodeData::Mapping { entries, flow },
            span: None,
            recursive: false,
            resolved: true,
            native_hint: None,
            comments: None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.data, NodeData::Scalar { .. })
    }
}

/// Index-addressed node storage for one document.
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        NodeArena::default()
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Cycle-safe structural equality between two graphs, ignoring styles,
    /// marks and comments. Two nodes compare equal when their tags match
    /// and their contents match recursively; a revisited pair of ids is
    /// taken as equal, which makes cyclic graphs comparable.
    pub fn value_eq(&self, a: NodeId, other: &NodeArena, b: NodeId) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.value_eq_inner(a, other, b, &mut seen)
    }

    fn value_eq_inner(
        &self,
        a: NodeId,
        other: &NodeArena,
        b: NodeId,
        seen: &mut std::collections::HashSet<(usize, usize)>,
    ) -> bool {
        if !seen.insert((a.0, b.0)) {
            return true;
        }
        let left = self.get(a);
        let right = other.get(b);
        if left.tag != right.tag {
            return false;
        }
        match (&left.data, &right.data) {
            (NodeData::Scalar { value: va, .. }, NodeData::Scalar { value: vb, .. }) => va == vb,
            (NodeData::Sequence { items: ia, .. }, NodeData::Sequence { items: ib, .. }) => {
                ia.len() == ib.len()
                    && ia
                        .iter()
                        .zip(ib.iter())
                        .all(|(&x, &y)| self.value_eq_inner(x, other, y, seen))
            }
            (NodeData::Mapping { entries: ea, .. }, NodeData::Mapping { entries: eb, .. }) => {
                ea.len() == eb.len()
                    && ea.iter().zip(eb.iter()).all(|(&(ka, va), &(kb, vb))| {
                        self.value_eq_inner(ka, other, kb, seen)
                            && self.value_eq_inner(va, other, vb, seen)
                    })
            }
            _ => false,
        }
    }
}

/// One composed document: an arena plus the id of its root node.
#[derive(Debug, Clone)]
pub struct Document {
    pub arena: NodeArena,
    pub root: NodeId,
    /// Comments found after the last node when comment parsing is enabled.
    pub end_comments: Vec<String>,
}

impl Document {
    pub fn root_node(&self) -> &Node {
        self.arena.get(self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_equality() {
        assert_eq!(Tag::standard("str"), tag::STR.clone());
        assert_ne!(Tag::new("!local"), tag::STR.clone());
        assert!(tag::MAP.is_global());
        assert!(!Tag::new("!local").is_global());
    }

    #[test]
    fn test_value_eq_ignores_style() {
        let mut a = NodeArena::new();
        let ra = a.alloc(Node::scalar(tag::STR.clone(), "x", ScalarStyle::Plain));
        let mut b = NodeArena::new();
        let rb = b.alloc(Node::scalar(tag::STR.clone(), "x", ScalarStyle::DoubleQuoted));
        assert!(a.value_eq(ra, &b, rb));
    }

    #[test]
    fn test_value_eq_cyclic() {
        let mut a = NodeArena::new();
        let seq = a.alloc(Node::sequence(tag::SEQ.clone(), Vec::new(), FlowStyle::Flow));
        if let NodeData::Sequence { items, .. } = &mut a.get_mut(seq).data {
            items.push(seq);
        }
        let b = a.clone();
        assert!(a.value_eq(seq, &b, seq));
    }
}
