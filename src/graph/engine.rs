//! The in-memory graph container.
//!
//! `SourceGraph` owns the node and edge maps, enforces the tree invariants
//! at insertion time, and answers hierarchy queries derived from parent
//! pointers. It is populated once by the builder, optionally merged with
//! sub-graphs from cross-file parsing, and then handed to the serializer
//! or a renderer unchanged.

use indexmap::IndexMap;
use tracing::debug;

use super::types::{Edge, EdgeId, EdgeKind, Node, NodeId, NodeKind};
use crate::error::{CartoError, Result};

/// The authoritative node/edge container.
///
/// Invariants after any successful build: exactly one node has
/// `parent = None` (the root); every other node's parent is present in the
/// same graph; ids are never reused. Edges are deliberately *not* validated
/// against the node map — an edge may be recorded before its target's
/// sub-graph is merged in, and anything still dangling at serialization
/// time is dropped there.
#[derive(Debug, Default, Clone)]
pub struct SourceGraph {
    nodes: IndexMap<NodeId, Node>,
    edges: IndexMap<EdgeId, Edge>,
    next_node: u64,
    next_edge: u64,
}

impl SourceGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Node Operations ────────────────────────────────────────

    /// Add a node with a freshly minted id. Returns the new id.
    ///
    /// Fails with `DanglingParent` if `parent` is non-null and absent; the
    /// check runs at insertion so the tree invariant can never be violated
    /// mid-build.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        label: impl Into<String>,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        let id = NodeId(self.next_node);
        self.insert_node(Node::new(id, kind, label, parent))?;
        Ok(id)
    }

    /// Insert a node under a caller-supplied id.
    ///
    /// Used by the builder (which mints globally unique ids across
    /// sub-builds) and the deserializer (which preserves document ids).
    /// Fails with `DuplicateId` on collision and `DanglingParent` as above.
    pub fn insert_node(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(CartoError::DuplicateId(node.id));
        }
        if let Some(parent) = node.parent {
            if !self.nodes.contains_key(&parent) {
                return Err(CartoError::DanglingParent {
                    node: node.id,
                    parent,
                });
            }
        }
        self.next_node = self.next_node.max(node.id.0 + 1);
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// The root node: the first node with no parent.
    pub fn root(&self) -> Option<&Node> {
        self.nodes.values().find(|n| n.parent.is_none())
    }

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ─── Edge Operations ────────────────────────────────────────

    /// Add an edge with a freshly minted id.
    ///
    /// Endpoints are not validated; see the type-level invariant note.
    pub fn add_edge(&mut self, kind: EdgeKind, source: NodeId, target: NodeId) -> EdgeId {
        let id = EdgeId(self.next_edge);
        self.insert_edge(Edge::new(id, kind, source, target));
        id
    }

    /// Insert an edge under a caller-supplied id.
    pub fn insert_edge(&mut self, edge: Edge) {
        self.next_edge = self.next_edge.max(edge.id.0 + 1);
        self.edges.insert(edge.id, edge);
    }

    /// All edges, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    // ─── Hierarchy Queries ──────────────────────────────────────
    //
    // All derived strictly from the `parent` field, independent of the
    // edge set.

    /// Walk the parent chain from `id` to the root, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(&id).and_then(|n| n.parent);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.nodes.get(&parent).and_then(|n| n.parent);
        }
        chain
    }

    /// Direct children of `id`, in insertion order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.parent == Some(id))
            .map(|n| n.id)
            .collect()
    }

    /// All transitive children of `id`, depth-first.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = self.children(id);
        stack.reverse();
        while let Some(next) = stack.pop() {
            found.push(next);
            let mut kids = self.children(next);
            kids.reverse();
            stack.extend(kids);
        }
        found
    }

    // ─── Merge ──────────────────────────────────────────────────

    /// Union another graph into this one, attaching its root under
    /// `attach_to`.
    ///
    /// Id spaces must already be disjoint (`DuplicateId` otherwise) and
    /// `attach_to` must exist (`DanglingParent`). The merged root is
    /// reparented under `attach_to` and the matching structural edge is
    /// added, preserving a single global root. Returns the merged root id.
    pub fn merge(&mut self, other: SourceGraph, attach_to: NodeId) -> Result<NodeId> {
        if !self.nodes.contains_key(&attach_to) {
            return Err(CartoError::DanglingParent {
                node: attach_to,
                parent: attach_to,
            });
        }
        let merged_root = other
            .root()
            .map(|n| n.id)
            .ok_or_else(|| CartoError::MalformedDocument("merged graph has no root".into()))?;
        for id in other.nodes.keys() {
            if self.nodes.contains_key(id) {
                return Err(CartoError::DuplicateId(*id));
            }
        }

        debug!(
            nodes = other.nodes.len(),
            edges = other.edges.len(),
            attach_to = %attach_to,
            "merging sub-graph"
        );
        for (id, mut node) in other.nodes {
            if id == merged_root {
                node.parent = Some(attach_to);
            }
            self.next_node = self.next_node.max(id.0 + 1);
            self.nodes.insert(id, node);
        }
        for (_, edge) in other.edges {
            // Edge ids are re-minted: the two graphs count independently.
            self.add_edge(edge.kind, edge.source, edge.target);
        }
        self.add_edge(EdgeKind::Structural, attach_to, merged_root);
        Ok(merged_root)
    }

    // ─── Stats ──────────────────────────────────────────────────

    /// Summary counts for logs and the CLI.
    pub fn stats(&self) -> GraphStats {
        let mut modules = 0;
        let mut classes = 0;
        let mut functions = 0;
        for node in self.nodes.values() {
            match node.kind {
                NodeKind::Module => modules += 1,
                NodeKind::Class => classes += 1,
                NodeKind::Function => functions += 1,
                _ => {}
            }
        }
        GraphStats {
            total_nodes: self.nodes.len(),
            total_edges: self.edges.len(),
            modules,
            classes,
            functions,
        }
    }
}

/// Statistics about the graph.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub modules: usize,
    pub classes: usize,
    pub functions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_root(graph: &mut SourceGraph) -> NodeId {
        graph.add_node(NodeKind::Module, "root", None).unwrap()
    }

    #[test]
    fn empty_graph_has_no_root() {
        let graph = SourceGraph::new();
        assert!(graph.root().is_none());
        assert_eq!(graph.stats().total_nodes, 0);
    }

    #[test]
    fn add_node_checks_parent_at_insertion() {
        let mut graph = SourceGraph::new();
        let root = module_root(&mut graph);
        assert!(graph.add_node(NodeKind::Function, "f", Some(root)).is_ok());

        let err = graph
            .add_node(NodeKind::Function, "g", Some(NodeId(999)))
            .unwrap_err();
        assert!(matches!(err, CartoError::DanglingParent { .. }));
    }

    #[test]
    fn insert_node_rejects_duplicate_id() {
        let mut graph = SourceGraph::new();
        graph
            .insert_node(Node::new(NodeId(7), NodeKind::Module, "m", None))
            .unwrap();
        let err = graph
            .insert_node(Node::new(NodeId(7), NodeKind::Module, "m2", None))
            .unwrap_err();
        assert!(matches!(err, CartoError::DuplicateId(NodeId(7))));
    }

    #[test]
    fn minted_ids_skip_caller_supplied_ones() {
        let mut graph = SourceGraph::new();
        graph
            .insert_node(Node::new(NodeId(10), NodeKind::Module, "m", None))
            .unwrap();
        let id = graph
            .add_node(NodeKind::Function, "f", Some(NodeId(10)))
            .unwrap();
        assert_eq!(id, NodeId(11));
    }

    #[test]
    fn add_edge_tolerates_missing_endpoints() {
        let mut graph = SourceGraph::new();
        let root = module_root(&mut graph);
        graph.add_edge(EdgeKind::Reference, root, NodeId(404));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn hierarchy_queries_follow_parent_pointers_only() {
        let mut graph = SourceGraph::new();
        let root = module_root(&mut graph);
        let class = graph.add_node(NodeKind::Class, "C", Some(root)).unwrap();
        let method = graph
            .add_node(NodeKind::Function, "m", Some(class))
            .unwrap();
        let var = graph
            .add_node(NodeKind::Variable, "x", Some(method))
            .unwrap();
        // No structural edges added at all: queries must still work.
        assert_eq!(graph.ancestors(var), vec![method, class, root]);
        assert_eq!(graph.children(root), vec![class]);
        assert_eq!(graph.descendants(root), vec![class, method, var]);
        assert_eq!(graph.descendants(var), Vec::<NodeId>::new());
    }

    #[test]
    fn merge_reparents_sub_root_and_links_it() {
        let mut main = SourceGraph::new();
        let root = module_root(&mut main);

        let mut sub = SourceGraph::new();
        sub.insert_node(Node::new(NodeId(100), NodeKind::Module, "b.py", None))
            .unwrap();
        sub.insert_node(Node::new(
            NodeId(101),
            NodeKind::Function,
            "f",
            Some(NodeId(100)),
        ))
        .unwrap();
        sub.add_edge(EdgeKind::Structural, NodeId(100), NodeId(101));

        let merged_root = main.merge(sub, root).unwrap();
        assert_eq!(merged_root, NodeId(100));
        assert_eq!(main.node(NodeId(100)).unwrap().parent, Some(root));
        assert_eq!(main.node_count(), 3);
        // one root only
        assert_eq!(main.nodes().filter(|n| n.parent.is_none()).count(), 1);
        // sub edge carried over plus the connecting edge
        assert_eq!(main.edge_count(), 2);
    }

    #[test]
    fn merge_rejects_colliding_ids() {
        let mut main = SourceGraph::new();
        let root = module_root(&mut main);

        let mut sub = SourceGraph::new();
        sub.insert_node(Node::new(root, NodeKind::Module, "dup", None))
            .unwrap();

        assert!(matches!(
            main.merge(sub, root),
            Err(CartoError::DuplicateId(_))
        ));
    }

    #[test]
    fn merge_rejects_missing_attach_point() {
        let mut main = SourceGraph::new();
        module_root(&mut main);

        let mut sub = SourceGraph::new();
        sub.insert_node(Node::new(NodeId(50), NodeKind::Module, "b", None))
            .unwrap();

        assert!(matches!(
            main.merge(sub, NodeId(999)),
            Err(CartoError::DanglingParent { .. })
        ));
    }

    #[test]
    fn stats_count_by_kind() {
        let mut graph = SourceGraph::new();
        let root = module_root(&mut graph);
        let class = graph.add_node(NodeKind::Class, "C", Some(root)).unwrap();
        graph.add_node(NodeKind::Function, "m", Some(class)).unwrap();
        graph.add_node(NodeKind::Variable, "x", Some(root)).unwrap();

        let stats = graph.stats();
        assert_eq!(stats.total_nodes, 4);
        assert_eq!(stats.modules, 1);
        assert_eq!(stats.classes, 1);
        assert_eq!(stats.functions, 1);
    }
}
