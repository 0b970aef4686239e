//! Error types for cartograph.
//!
//! Build-time invariant breaches (`DuplicateId`, `DanglingParent`) and
//! serializer failures always propagate; per-location parse problems are
//! recovered by the builder in batch mode and reported as diagnostics
//! instead (see [`crate::parser::Diagnostic`]).

use std::path::PathBuf;

use thiserror::Error;

use crate::graph::NodeId;

/// All errors surfaced by the cartograph library.
#[derive(Debug, Error)]
pub enum CartoError {
    /// A source location could not be read from disk.
    #[error("failed to read {path}: {source}")]
    UnreadableLocation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A source location is not valid Python.
    #[error("syntax error in {file} at line {line}, column {column}: {detail}")]
    Grammar {
        file: String,
        line: usize,
        column: usize,
        detail: String,
    },

    /// A caller-supplied node id collides with an existing node.
    #[error("duplicate node id {0}")]
    DuplicateId(NodeId),

    /// A node was inserted with a parent that is not in the graph.
    #[error("node {node} references missing parent {parent}")]
    DanglingParent { node: NodeId, parent: NodeId },

    /// A save target directory or load source file does not exist.
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    /// A document failed to parse or is missing required structure.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A palette file failed validation.
    #[error("invalid palette: {0}")]
    InvalidPalette(String),

    /// Underlying filesystem failure while persisting or loading.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CartoError>;
