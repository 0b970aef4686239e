//! Source parsing — locations, the Python grammar, and the graph builder.

pub mod language;
pub mod walker;

pub use language::{parse_python, SourceLocation};
pub use walker::{BuildReport, BuilderOptions, Diagnostic, DiagnosticReason, GraphBuilder};
