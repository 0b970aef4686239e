//! Graph ↔ document conversion and document file I/O.
//!
//! `to_document` is pure; persistence is a separate step. Loading never
//! assumes the document holds exactly one tree: the root-removal built
//! into `to_document` usually leaves one, but orphan trees are preserved
//! defensively and walked like any other.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::document::{EdgeObject, GraphDocument, NodeObject};
use crate::error::{CartoError, Result};
use crate::graph::{Edge, EdgeId, Node, NodeId, SourceGraph};

/// Render a graph as a document.
///
/// Every node appears exactly once: nested under its parent, or at top
/// level if it has no parent (the root) or its parent is missing from the
/// node map (defensive fallback). Edges with an endpoint absent from the
/// node map are dropped silently — they are expected leftovers of
/// partial-merge states, not errors.
pub fn to_document(graph: &SourceGraph) -> GraphDocument {
    let node_ids: HashSet<NodeId> = graph.nodes().map(|n| n.id).collect();

    let mut edges = IndexMap::new();
    let mut edges_by_source: IndexMap<NodeId, Vec<EdgeObject>> = IndexMap::new();
    for edge in graph.edges() {
        if !node_ids.contains(&edge.source) || !node_ids.contains(&edge.target) {
            debug!(edge = %edge.id, from = %edge.source, to = %edge.target, "dropping dangling edge");
            continue;
        }
        let object = EdgeObject {
            id: edge.id.0,
            object_type: "edge".to_string(),
            kind: edge.kind,
            source: edge.source,
            target: edge.target,
        };
        edges.insert(edge.id.to_string(), object.clone());
        edges_by_source.entry(edge.source).or_default().push(object);
    }

    let mut nodes = IndexMap::new();
    for node in graph.nodes() {
        let top_level = match node.parent {
            None => true,
            Some(parent) => !node_ids.contains(&parent),
        };
        if top_level {
            nodes.insert(
                node.id.to_string(),
                nest_node(graph, node, &edges_by_source),
            );
        }
    }

    GraphDocument { nodes, edges }
}

/// Build the nested object for one node, children in insertion order.
fn nest_node(
    graph: &SourceGraph,
    node: &Node,
    edges_by_source: &IndexMap<NodeId, Vec<EdgeObject>>,
) -> NodeObject {
    let children = graph
        .children(node.id)
        .into_iter()
        .filter_map(|id| graph.node(id))
        .map(|child| nest_node(graph, child, edges_by_source))
        .collect();
    NodeObject {
        id: node.id,
        kind: node.kind,
        label: node.label.clone(),
        base: node.base.clone(),
        parent: node.parent,
        children,
        edges: edges_by_source.get(&node.id).cloned().unwrap_or_default(),
    }
}

/// Rebuild a graph from a document.
///
/// Walks every top-level tree, registering each object and its
/// descendants under their document ids, then adds every edge whose
/// endpoints were registered. Duplicate ids are a `MalformedDocument`
/// error; an edge with an unknown endpoint is skipped.
pub fn to_graph(document: &GraphDocument) -> Result<SourceGraph> {
    let mut known = HashSet::new();
    for object in document.nodes.values() {
        collect_ids(object, &mut known);
    }

    let mut graph = SourceGraph::new();
    for object in document.nodes.values() {
        register(&mut graph, object, &known)?;
    }

    for edge in document.edges.values() {
        if !known.contains(&edge.source) || !known.contains(&edge.target) {
            debug!(edge = edge.id, "skipping edge with unknown endpoint");
            continue;
        }
        graph.insert_edge(Edge::new(
            EdgeId(edge.id),
            edge.kind,
            edge.source,
            edge.target,
        ));
    }
    Ok(graph)
}

fn collect_ids(object: &NodeObject, known: &mut HashSet<NodeId>) {
    known.insert(object.id);
    for child in &object.children {
        collect_ids(child, known);
    }
}

fn register(graph: &mut SourceGraph, object: &NodeObject, known: &HashSet<NodeId>) -> Result<()> {
    let mut parent = object.parent;
    if let Some(declared) = parent {
        if !known.contains(&declared) {
            warn!(node = %object.id, missing = %declared, "declared parent missing; re-rooting");
            parent = None;
        }
    }
    let mut node = Node::new(object.id, object.kind, object.label.clone(), parent);
    node.base = object.base.clone();
    graph
        .insert_node(node)
        .map_err(|err| CartoError::MalformedDocument(err.to_string()))?;
    for child in &object.children {
        register(graph, child, known)?;
    }
    Ok(())
}

/// Write a document to disk.
///
/// The target directory must already exist (`PathNotFound` otherwise —
/// creating it is the caller's decision). The document is written to a
/// sibling temp file and atomically renamed over the target so a crash
/// never leaves a partial document behind.
pub fn save_document(path: &Path, document: &GraphDocument) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    if !dir.is_dir() {
        return Err(CartoError::PathNotFound(dir));
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.json".to_string());
    let tmp = dir.join(format!("{file_name}.tmp"));
    {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, document)
            .map_err(|err| CartoError::MalformedDocument(err.to_string()))?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read a document from disk.
pub fn load_document(path: &Path) -> Result<GraphDocument> {
    if !path.is_file() {
        return Err(CartoError::PathNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|err| CartoError::MalformedDocument(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, NodeKind};
    use crate::parser::{GraphBuilder, SourceLocation};

    fn scenario_graph() -> SourceGraph {
        let report = GraphBuilder::new()
            .build(&[
                SourceLocation::inline("a.py", "import b\nx = 1\n"),
                SourceLocation::inline("b.py", "def f():\n    pass\n"),
            ])
            .unwrap();
        report.graph
    }

    /// (kind, label, ancestor-kind-path) tuple for round-trip comparison.
    fn shape(graph: &SourceGraph) -> Vec<(NodeKind, String, Vec<NodeKind>)> {
        let mut tuples: Vec<_> = graph
            .nodes()
            .map(|n| {
                let path: Vec<NodeKind> = graph
                    .ancestors(n.id)
                    .into_iter()
                    .filter_map(|id| graph.node(id))
                    .map(|a| a.kind)
                    .collect();
                (n.kind, n.label.clone(), path)
            })
            .collect();
        tuples.sort();
        tuples
    }

    #[test]
    fn document_nests_children_and_keeps_only_root_at_top_level() {
        let graph = scenario_graph();
        let document = to_document(&graph);

        assert_eq!(document.nodes.len(), 1, "only the root stays top-level");
        let root = document.nodes.values().next().unwrap();
        assert_eq!(root.label, "root");
        assert_eq!(root.parent, None);
        assert_eq!(root.children.len(), 2);

        // all 6 nodes reachable through nesting
        let mut count = 0;
        let mut stack = vec![root];
        while let Some(object) = stack.pop() {
            count += 1;
            stack.extend(object.children.iter());
        }
        assert_eq!(count, 6);
        assert_eq!(document.edges.len(), 6);
    }

    #[test]
    fn to_document_is_pure() {
        let graph = scenario_graph();
        let first = serde_json::to_value(to_document(&graph)).unwrap();
        let second = serde_json::to_value(to_document(&graph)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn round_trip_preserves_shape_and_edges() {
        let graph = scenario_graph();
        let document = to_document(&graph);
        let rebuilt = to_graph(&document).unwrap();

        assert_eq!(shape(&graph), shape(&rebuilt));
        assert_eq!(graph.edge_count(), rebuilt.edge_count());

        let references: Vec<_> = rebuilt
            .edges()
            .filter(|e| e.kind == EdgeKind::Reference)
            .collect();
        assert_eq!(references.len(), 1);
    }

    #[test]
    fn serializing_twice_yields_the_same_document() {
        let graph = scenario_graph();
        let document = to_document(&graph);
        let again = to_document(&to_graph(&document).unwrap());
        assert_eq!(
            serde_json::to_value(&document).unwrap(),
            serde_json::to_value(&again).unwrap()
        );
    }

    #[test]
    fn dangling_edges_are_dropped_not_fatal() {
        let mut graph = SourceGraph::new();
        let root = graph.add_node(NodeKind::Module, "root", None).unwrap();
        let child = graph
            .add_node(NodeKind::Function, "f", Some(root))
            .unwrap();
        graph.add_edge(EdgeKind::Structural, root, child);
        graph.add_edge(EdgeKind::Reference, child, NodeId(404));

        let document = to_document(&graph);
        assert_eq!(document.edges.len(), 1);
        let root_object = document.nodes.values().next().unwrap();
        assert_eq!(root_object.edges.len(), 1);
        assert!(root_object.children[0].edges.is_empty());
    }

    #[test]
    fn orphan_trees_survive_loading() {
        let mut graph = SourceGraph::new();
        let root = graph.add_node(NodeKind::Module, "root", None).unwrap();
        graph.add_node(NodeKind::Variable, "x", Some(root)).unwrap();
        let mut document = to_document(&graph);

        // splice in a top-level object whose declared parent never existed
        let orphan = NodeObject {
            id: NodeId(77),
            kind: NodeKind::Function,
            label: "ghost".to_string(),
            base: None,
            parent: Some(NodeId(999)),
            children: vec![],
            edges: vec![],
        };
        document.nodes.insert("77".to_string(), orphan);

        let rebuilt = to_graph(&document).unwrap();
        assert_eq!(rebuilt.node_count(), 3);
        let ghost = rebuilt.node(NodeId(77)).unwrap();
        assert_eq!(ghost.parent, None, "missing parent is cleared on load");
    }

    #[test]
    fn duplicate_document_ids_are_malformed() {
        let graph = scenario_graph();
        let mut document = to_document(&graph);
        let root = document.nodes.values().next().unwrap().clone();
        document.nodes.insert("copy".to_string(), root);

        assert!(matches!(
            to_graph(&document),
            Err(CartoError::MalformedDocument(_))
        ));
    }

    #[test]
    fn save_requires_existing_directory() {
        let graph = scenario_graph();
        let document = to_document(&graph);
        let missing = Path::new("/no/such/dir/out.json");
        assert!(matches!(
            save_document(missing, &document),
            Err(CartoError::PathNotFound(_))
        ));
    }

    #[test]
    fn save_and_load_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let graph = scenario_graph();
        let document = to_document(&graph);

        save_document(&path, &document).unwrap();
        assert!(path.is_file());
        // no temp file left behind
        assert!(!dir.path().join("graph.json.tmp").exists());

        let loaded = load_document(&path).unwrap();
        assert_eq!(
            serde_json::to_value(&document).unwrap(),
            serde_json::to_value(&loaded).unwrap()
        );
    }

    #[test]
    fn load_rejects_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();

        let absent = dir.path().join("absent.json");
        assert!(matches!(
            load_document(&absent),
            Err(CartoError::PathNotFound(_))
        ));

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "not json at all").unwrap();
        assert!(matches!(
            load_document(&garbage),
            Err(CartoError::MalformedDocument(_))
        ));

        let missing_keys = dir.path().join("missing.json");
        fs::write(&missing_keys, r#"{"nodes": {}}"#).unwrap();
        assert!(matches!(
            load_document(&missing_keys),
            Err(CartoError::MalformedDocument(_))
        ));
    }
}
