/// Tree-sitter setup for Go source.
use std::path::Path;

use tree_sitter::{Language, Node, Parser, Tree};

use crate::error::Error;

/// Maximum source file size (16 MiB).
const MAX_FILE_SIZE: usize = 16 * 1024 * 1024;

/// The tree-sitter Go language.
pub fn go() -> Language {
    return tree_sitter_go::LANGUAGE.into();
}

/// Parse Go source into a tree-sitter tree.
///
/// `file` is only used in error messages; it may be a synthetic name.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the source is too large, the language
/// cannot be set, or tree-sitter gives up.
pub fn parse(file: &Path, source: &str) -> Result<Tree, Error> {
    if source.len() > MAX_FILE_SIZE {
        return Err(Error::ParseFailed {
            file: file.to_path_buf(),
            reason: format!("{} bytes exceeds the {MAX_FILE_SIZE} byte limit", source.len()),
        });
    }

    let mut parser = Parser::new();
    parser.set_language(&go()).map_err(|e| {
        return Error::ParseFailed {
            file: file.to_path_buf(),
            reason: e.to_string(),
        };
    })?;

    return parser.parse(source, None).ok_or_else(|| {
        return Error::ParseFailed {
            file: file.to_path_buf(),
            reason: "tree-sitter returned None".to_owned(),
        };
    });
}

/// Source text covered by `node`. Empty if the range is not valid UTF-8.
pub fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    return node.utf8_text(source.as_bytes()).unwrap_or("");
}

/// Named children of `node`, in source order.
pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    return node.named_children(&mut cursor).collect();
}

/// Every child of `node` (named or not), in source order.
pub fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    return node.children(&mut cursor).collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_go_source() {
        let tree = parse(Path::new("x.go"), "package foo\n\nfunc F() {}\n").unwrap();
        let root = tree.root_node();
        assert_eq!(root.kind(), "source_file");
        assert!(!root.has_error());

        let kinds: Vec<&str> = named_children(root).iter().map(|n| n.kind()).collect();
        assert_eq!(kinds, ["package_clause", "function_declaration"]);
    }

    #[test]
    fn text_reads_node_range() {
        let source = "package foo\n";
        let tree = parse(Path::new("x.go"), source).unwrap();
        let clause = tree.root_node().child(0).unwrap();
        assert_eq!(text(clause, source), "package foo");
    }
}
