//! Core types for the cartograph source graph.
//!
//! Defines node kinds, edge kinds, and the data structures that
//! represent source constructs and their relationships.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node, unique within one graph.
///
/// Minted from a monotonically increasing counter scoped to a build run,
/// never from host object identity, so ids stay meaningful across
/// serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an edge, unique within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub u64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of a node in the source graph.
///
/// This is the closed set of constructs the walker recognizes. Constructs
/// outside this set never get a node; the walker descends through them
/// transparently. The container and comprehension variants double as
/// type-context tags: a name bound inside `[...]` is recorded as `List`
/// rather than `Variable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// A source file, or the synthetic analysis root.
    Module,
    /// A class definition.
    Class,
    /// A function or method definition.
    Function,
    /// A bound name (assignment target, parameter, loop variable).
    Variable,
    /// An `import x` statement, one node per imported target.
    Import,
    /// A `from x import y` statement, one node per imported name.
    ImportFrom,
    /// A call site with a resolvable callee name.
    Call,
    Return,
    Raise,
    Delete,
    Global,
    Nonlocal,
    For,
    While,
    If,
    Try,
    With,
    ExceptHandler,
    Match,
    /// Type-context tags for names bound inside container literals.
    List,
    Dict,
    Set,
    Tuple,
    /// Type-context tags for names bound inside comprehensions.
    ListComp,
    DictComp,
    SetComp,
    GeneratorExp,
    /// Fallback for kinds read from documents written by newer versions.
    #[serde(other)]
    Unknown,
}

impl NodeKind {
    /// The serialized name, used as the style-table key.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Module => "Module",
            NodeKind::Class => "Class",
            NodeKind::Function => "Function",
            NodeKind::Variable => "Variable",
            NodeKind::Import => "Import",
            NodeKind::ImportFrom => "ImportFrom",
            NodeKind::Call => "Call",
            NodeKind::Return => "Return",
            NodeKind::Raise => "Raise",
            NodeKind::Delete => "Delete",
            NodeKind::Global => "Global",
            NodeKind::Nonlocal => "Nonlocal",
            NodeKind::For => "For",
            NodeKind::While => "While",
            NodeKind::If => "If",
            NodeKind::Try => "Try",
            NodeKind::With => "With",
            NodeKind::ExceptHandler => "ExceptHandler",
            NodeKind::Match => "Match",
            NodeKind::List => "List",
            NodeKind::Dict => "Dict",
            NodeKind::Set => "Set",
            NodeKind::Tuple => "Tuple",
            NodeKind::ListComp => "ListComp",
            NodeKind::DictComp => "DictComp",
            NodeKind::SetComp => "SetComp",
            NodeKind::GeneratorExp => "GeneratorExp",
            NodeKind::Unknown => "Unknown",
        }
    }

    /// Display label for statement constructs that carry no name of their own.
    pub fn keyword_label(&self) -> Option<&'static str> {
        match self {
            NodeKind::Return => Some("return"),
            NodeKind::Raise => Some("raise"),
            NodeKind::Delete => Some("del"),
            NodeKind::Global => Some("global"),
            NodeKind::Nonlocal => Some("nonlocal"),
            NodeKind::For => Some("for"),
            NodeKind::While => Some("while"),
            NodeKind::If => Some("if"),
            NodeKind::Try => Some("try"),
            NodeKind::With => Some("with"),
            NodeKind::ExceptHandler => Some("except"),
            NodeKind::Match => Some("match"),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of an edge in the source graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Parent-to-child hierarchy link, redundant with [`Node::parent`] but
    /// explicit so the graph can be traversed without walking parent
    /// pointers.
    #[default]
    Structural,
    /// Cross-reference: import node to imported module root, call site to
    /// call target.
    Reference,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Structural => write!(f, "structural"),
            EdgeKind::Reference => write!(f, "reference"),
        }
    }
}

/// One syntactic construct in the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Display name: the construct's own name, its keyword, or a
    /// synthesized placeholder.
    pub label: String,
    /// The enclosing node. `None` only for the single analysis root.
    pub parent: Option<NodeId>,
    /// Optional style indirection key consumed by the palette layer.
    pub base: Option<String>,
}

impl Node {
    pub fn new(
        id: NodeId,
        kind: NodeKind,
        label: impl Into<String>,
        parent: Option<NodeId>,
    ) -> Self {
        Self {
            id,
            kind,
            label: label.into(),
            parent,
            base: None,
        }
    }

    /// Derive a label when the construct has no name: its keyword if it is
    /// a statement, otherwise an explicit placeholder.
    pub fn fallback_label(kind: NodeKind) -> String {
        match kind.keyword_label() {
            Some(keyword) => keyword.to_string(),
            None => format!("{kind} (unlabeled)"),
        }
    }
}

/// A directed relation between two node ids.
///
/// Endpoints are not required to exist at insertion time; edges whose
/// endpoints never materialize are dropped at serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub kind: EdgeKind,
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(id: EdgeId, kind: EdgeKind, source: NodeId, target: NodeId) -> Self {
        Self {
            id,
            kind,
            source,
            target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_as_pascal_case() {
        let json = serde_json::to_string(&NodeKind::ImportFrom).unwrap();
        assert_eq!(json, "\"ImportFrom\"");
    }

    #[test]
    fn unknown_kind_absorbs_foreign_names() {
        let kind: NodeKind = serde_json::from_str("\"Hologram\"").unwrap();
        assert_eq!(kind, NodeKind::Unknown);
    }

    #[test]
    fn fallback_label_prefers_keyword() {
        assert_eq!(Node::fallback_label(NodeKind::For), "for");
        assert_eq!(Node::fallback_label(NodeKind::Class), "Class (unlabeled)");
    }

    #[test]
    fn edge_kind_defaults_to_structural() {
        assert_eq!(EdgeKind::default(), EdgeKind::Structural);
    }
}
