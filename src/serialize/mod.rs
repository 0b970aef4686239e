//! Bidirectional graph ↔ JSON document conversion and persistence.

pub mod document;
pub mod serializer;

pub use document::{EdgeObject, GraphDocument, NodeObject};
pub use serializer::{load_document, save_document, to_document, to_graph};
