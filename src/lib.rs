//! # Cartograph
//!
//! Structural source maps for Python projects.
//!
//! Cartograph walks Python syntax trees into a typed, directed graph of
//! modules, classes, functions, statements and imports, persists that
//! graph as a JSON document, and reconstructs graphs from documents so a
//! rendering layer can lay them out and draw them.
//!
//! ## Key pieces
//!
//! - **Builder**: depth-first syntax walker with cross-file import
//!   resolution (cycle-safe)
//! - **Graph**: id-keyed node/edge container with hierarchy queries
//! - **Serializer**: lossless-as-practical graph ↔ JSON round trip
//! - **Palette**: kind → visual style lookup for renderers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cartograph::{to_document, GraphBuilder, SourceLocation};
//!
//! let report = GraphBuilder::new()
//!     .build(&[SourceLocation::path("main.py")])
//!     .unwrap();
//! let document = to_document(&report.graph);
//! // hand `document` to a renderer, or persist it with save_document
//! ```

pub mod error;
pub mod graph;
pub mod parser;
pub mod serialize;
pub mod style;

// Re-exports for convenience
pub use error::{CartoError, Result};

pub use graph::{Edge, EdgeId, EdgeKind, GraphStats, Node, NodeId, NodeKind, SourceGraph};
pub use parser::{
    BuildReport, BuilderOptions, Diagnostic, DiagnosticReason, GraphBuilder, SourceLocation,
};
pub use serialize::{
    load_document, save_document, to_document, to_graph, EdgeObject, GraphDocument, NodeObject,
};
pub use style::{NodeStyle, Palette};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_python_service() {
        let source = r#"
import os
from typing import Optional

class UserService:
    def __init__(self, db):
        self.db = db

    def get_user(self, user_id):
        return self.db.find(user_id)

def main():
    service = UserService(None)
"#;
        let report = GraphBuilder::new()
            .build(&[SourceLocation::inline("service.py", source)])
            .unwrap();
        let graph = &report.graph;

        let labels: Vec<&str> = graph.nodes().map(|n| n.label.as_str()).collect();
        assert!(labels.contains(&"UserService"));
        assert!(labels.contains(&"get_user"));
        assert!(labels.contains(&"main"));

        let class = graph
            .nodes()
            .find(|n| n.kind == NodeKind::Class && n.label == "UserService")
            .unwrap();
        let init = graph
            .nodes()
            .find(|n| n.kind == NodeKind::Function && n.label == "__init__")
            .unwrap();
        assert_eq!(init.parent, Some(class.id));

        // os and typing are outside the analyzed set
        assert_eq!(report.diagnostics.len(), 2);
    }

    #[test]
    fn test_every_build_has_exactly_one_root() {
        let corpus = [
            "x = 1\n",
            "def f(a, b=2):\n    return a\n",
            "class A:\n    class B:\n        pass\n",
            "for i in range(3):\n    while True:\n        break\n",
            "try:\n    pass\nexcept Exception:\n    raise\nfinally:\n    pass\n",
            "with open('f') as fh:\n    data = fh.read()\n",
            "match x:\n    case 1:\n        pass\n    case _:\n        pass\n",
            "values = {k: v for k, v in items}\n",
            "del x\nglobal y\n",
        ];
        for (index, source) in corpus.iter().enumerate() {
            let name = format!("case{index}.py");
            let report = GraphBuilder::new()
                .build(&[SourceLocation::inline(name.clone(), *source)])
                .unwrap();
            let graph = &report.graph;

            let roots: Vec<_> = graph.nodes().filter(|n| n.parent.is_none()).collect();
            assert_eq!(roots.len(), 1, "{name}: expected one root");
            let modules = graph
                .nodes()
                .filter(|n| n.kind == NodeKind::Module && n.parent.is_some())
                .count();
            assert_eq!(modules, 1, "{name}: expected one module");
            for node in graph.nodes() {
                if let Some(parent) = node.parent {
                    assert!(
                        graph.node(parent).is_some(),
                        "{name}: dangling parent on {}",
                        node.label
                    );
                }
            }
        }
    }

    #[test]
    fn test_document_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let report = GraphBuilder::new()
            .build(&[
                SourceLocation::inline("a.py", "import b\nx = [1, 2]\n"),
                SourceLocation::inline("b.py", "def f():\n    pass\n"),
            ])
            .unwrap();

        let document = to_document(&report.graph);
        let path = dir.path().join("graph.json");
        save_document(&path, &document).unwrap();

        let rebuilt = to_graph(&load_document(&path).unwrap()).unwrap();
        assert_eq!(rebuilt.node_count(), report.graph.node_count());
        assert_eq!(rebuilt.edge_count(), report.graph.edge_count());

        let tagged = rebuilt
            .nodes()
            .find(|n| n.label == "x")
            .unwrap();
        assert_eq!(tagged.kind, NodeKind::List);
    }

    #[test]
    fn test_renderer_contract_never_fails() {
        // a renderer reads kind/label/parent per node and asks the palette
        // for a style; no node kind may break that loop
        let source = "class C:\n    def m(self):\n        return [i for i in self.xs]\n";
        let report = GraphBuilder::new()
            .build(&[SourceLocation::inline("r.py", source)])
            .unwrap();
        let palette = Palette::in_memory().unwrap();

        for node in report.graph.nodes() {
            let style = palette.get_style(node.kind.as_str());
            assert!(!style.shape.is_empty());
        }
    }

    #[test]
    fn test_batch_report_explains_every_missing_module() {
        let report = GraphBuilder::new()
            .build(&[
                SourceLocation::inline("ok.py", "x = 1\n"),
                SourceLocation::inline("broken.py", "def f(:\n"),
                SourceLocation::inline("also_ok.py", "y = 2\n"),
            ])
            .unwrap();

        let modules = report
            .graph
            .nodes()
            .filter(|n| n.kind == NodeKind::Module && n.parent.is_some())
            .count();
        // two parsed modules, one diagnostic accounts for the third
        assert_eq!(modules, 2);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].location, "broken.py");
    }
}
