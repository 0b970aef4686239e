//! The persisted document shape.
//!
//! A document is a flat `nodes` map holding the root tree(s) with children
//! nested recursively, plus a flat `edges` map. Map keys are the decimal
//! form of the ids they hold (JSON object keys are strings).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::graph::{EdgeKind, NodeId, NodeKind};

/// A serialized graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: IndexMap<String, NodeObject>,
    pub edges: IndexMap<String, EdgeObject>,
}

/// One node with its children nested inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeObject {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub children: Vec<NodeObject>,
    #[serde(default)]
    pub edges: Vec<EdgeObject>,
}

/// One edge. `type` is the fixed discriminator `"edge"`; `kind` carries
/// the structural/reference distinction and defaults to structural when
/// absent so older documents stay loadable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeObject {
    pub id: u64,
    #[serde(rename = "type", default = "edge_type")]
    pub object_type: String,
    #[serde(default)]
    pub kind: EdgeKind,
    pub source: NodeId,
    pub target: NodeId,
}

fn edge_type() -> String {
    "edge".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_object_round_trips_with_fixed_type() {
        let edge = EdgeObject {
            id: 3,
            object_type: edge_type(),
            kind: EdgeKind::Reference,
            source: NodeId(1),
            target: NodeId(2),
        };
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["type"], "edge");
        assert_eq!(json["kind"], "reference");

        let back: EdgeObject = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind, EdgeKind::Reference);
    }

    #[test]
    fn edge_kind_defaults_when_missing() {
        let json = r#"{"id": 0, "type": "edge", "source": 1, "target": 2}"#;
        let edge: EdgeObject = serde_json::from_str(json).unwrap();
        assert_eq!(edge.kind, EdgeKind::Structural);
    }

    #[test]
    fn node_object_children_default_to_empty() {
        let json = r#"{"id": 4, "type": "Variable", "label": "x", "parent": 1}"#;
        let node: NodeObject = serde_json::from_str(json).unwrap();
        assert!(node.children.is_empty());
        assert!(node.edges.is_empty());
        assert!(node.base.is_none());
    }
}
