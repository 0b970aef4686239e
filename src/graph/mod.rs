//! Source graph module — the structural backbone of cartograph.
//!
//! Provides the graph data model, the container with its invariants,
//! and the hierarchy/merge operations the builder and serializer rely on.

pub mod engine;
pub mod types;

pub use engine::{GraphStats, SourceGraph};
pub use types::{Edge, EdgeId, EdgeKind, Node, NodeId, NodeKind};
