//! Source locations and tree-sitter grammar loading.

use std::fs;
use std::path::{Path, PathBuf};

use tree_sitter::{Node as TsNode, Parser, Tree};

use crate::error::{CartoError, Result};

/// One parseable source location: a file on disk or an in-memory pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// A `.py` file path, absolute or relative to the caller's cwd.
    Path(PathBuf),
    /// In-memory source, used by tests and embedders.
    Inline { name: String, text: String },
}

impl SourceLocation {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        SourceLocation::Path(path.into())
    }

    pub fn inline(name: impl Into<String>, text: impl Into<String>) -> Self {
        SourceLocation::Inline {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Display name: the file basename, or the inline name.
    pub fn display_name(&self) -> String {
        match self {
            SourceLocation::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            SourceLocation::Inline { name, .. } => name.clone(),
        }
    }

    /// The importable module name: basename without the `.py` extension.
    pub fn module_stem(&self) -> String {
        match self {
            SourceLocation::Path(path) => path
                .file_stem()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            SourceLocation::Inline { name, .. } => {
                name.strip_suffix(".py").unwrap_or(name).to_string()
            }
        }
    }

    /// Stable key for the parsed/in-progress bookkeeping sets.
    pub fn key(&self) -> String {
        match self {
            SourceLocation::Path(path) => {
                let resolved = path.canonicalize().unwrap_or_else(|_| path.clone());
                resolved.display().to_string()
            }
            SourceLocation::Inline { name, .. } => format!("inline:{name}"),
        }
    }

    /// Read the source text, failing with `UnreadableLocation` for files.
    pub fn read(&self) -> Result<String> {
        match self {
            SourceLocation::Path(path) => {
                fs::read_to_string(path).map_err(|source| CartoError::UnreadableLocation {
                    path: path.clone(),
                    source,
                })
            }
            SourceLocation::Inline { text, .. } => Ok(text.clone()),
        }
    }
}

impl From<&Path> for SourceLocation {
    fn from(path: &Path) -> Self {
        SourceLocation::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for SourceLocation {
    fn from(path: PathBuf) -> Self {
        SourceLocation::Path(path)
    }
}

/// Parse Python source into a syntax tree.
///
/// Tree-sitter recovers from bad input by inserting error nodes rather
/// than failing, so a tree containing errors is converted into a
/// `Grammar` error carrying the first error's position.
pub fn parse_python(text: &str, file: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .expect("python grammar is compatible with the linked tree-sitter");
    let tree = parser
        .parse(text, None)
        .ok_or_else(|| CartoError::Grammar {
            file: file.to_string(),
            line: 0,
            column: 0,
            detail: "parser produced no tree".to_string(),
        })?;

    let root = tree.root_node();
    if root.has_error() {
        let (line, column, detail) = first_error(root);
        return Err(CartoError::Grammar {
            file: file.to_string(),
            line,
            column,
            detail,
        });
    }
    Ok(tree)
}

/// Locate the first ERROR or MISSING node, depth-first. Lines are 1-indexed.
fn first_error(node: TsNode<'_>) -> (usize, usize, String) {
    if node.is_error() || node.is_missing() {
        let pos = node.start_position();
        let detail = if node.is_missing() {
            format!("missing {}", node.kind())
        } else {
            "unexpected token".to_string()
        };
        return (pos.row + 1, pos.column + 1, detail);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            return first_error(child);
        }
    }
    let pos = node.start_position();
    (pos.row + 1, pos.column + 1, "syntax error".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_source() {
        let tree = parse_python("def f():\n    return 1\n", "f.py").unwrap();
        assert_eq!(tree.root_node().kind(), "module");
    }

    #[test]
    fn reports_position_for_bad_source() {
        let err = parse_python("def broken(:\n", "bad.py").unwrap_err();
        match err {
            CartoError::Grammar { file, line, .. } => {
                assert_eq!(file, "bad.py");
                assert!(line >= 1);
            }
            other => panic!("expected grammar error, got {other:?}"),
        }
    }

    #[test]
    fn module_stem_strips_extension() {
        let loc = SourceLocation::path("pkg/utils.py");
        assert_eq!(loc.module_stem(), "utils");
        assert_eq!(loc.display_name(), "utils.py");

        let inline = SourceLocation::inline("a.py", "x = 1");
        assert_eq!(inline.module_stem(), "a");
    }

    #[test]
    fn inline_read_never_fails() {
        let loc = SourceLocation::inline("a.py", "x = 1");
        assert_eq!(loc.read().unwrap(), "x = 1");
    }

    #[test]
    fn missing_file_is_unreadable() {
        let loc = SourceLocation::path("/definitely/not/here.py");
        assert!(matches!(
            loc.read(),
            Err(CartoError::UnreadableLocation { .. })
        ));
    }
}
