//! Loading a Go package from disk: package clause, imports, and top-level
//! declarations with their doc comments.
//!
//! Declaration text is reduced to what a reader of the documentation needs:
//! function bodies are dropped, and each spec of a `type ( ... )` group is
//! lifted into its own `type` declaration. Test files contribute only their
//! `Example` functions.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tree_sitter::Node;

use crate::error::Error;
use crate::grammar;
use crate::types::PackageRef;

/// Start of an expected-output comment at the end of an example.
static OUTPUT: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used, reason = "pattern is a literal")]
    return Regex::new(r"(?i)^\s*(unordered )?output:").expect("valid regex");
});

/// A parsed package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Top-level declarations in file order, then source order.
    pub decls: Vec<Decl>,
    /// Package doc comment, markers removed.
    pub doc: String,
    /// `Example` functions from the package's test files, in file order.
    pub examples: Vec<Example>,
    /// Import path.
    pub import_path: String,
    /// Per-file import tables: local name to import path. Indexed by
    /// [`Decl::file`].
    pub imports: Vec<HashMap<String, String>>,
    /// Name from the `package` clause.
    pub name: String,
    /// Every name declared at package scope, exported or not. Excludes
    /// methods and `init`.
    pub top_level: HashSet<String>,
}

/// One top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
    /// Doc comment, markers removed.
    pub doc: String,
    /// Index of the declaring file in [`Package::imports`].
    pub file: usize,
    /// What was declared.
    pub kind: DeclKind,
    /// Declaration source text.
    pub text: String,
}

/// A testable example: a `func ExampleXxx()` in a `_test.go` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    /// Body without its braces, dedented, with the output comment removed.
    pub code: String,
    /// Doc comment.
    pub doc: String,
    /// Function name after `Example`: empty, `F`, `T_M`, `_suffix`, ...
    pub name: String,
    /// Expected output, when the body ends with an `// Output:` comment.
    pub output: Option<String>,
}

/// What a [`Decl`] declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclKind {
    /// `const` declaration or group.
    Const {
        /// Declared names in order.
        names: Vec<String>,
        /// Explicit type of the first spec, if it is a plain type name.
        type_name: Option<String>,
    },
    /// Function.
    Func {
        /// Function name.
        name: String,
        /// Type named by the first result, through any pointer.
        result_type: Option<String>,
    },
    /// Method.
    Method {
        /// Method name.
        name: String,
        /// Receiver base type, without pointer or type arguments.
        recv: String,
    },
    /// Single type.
    Type {
        /// Type name.
        name: String,
    },
    /// `var` declaration or group.
    Var {
        /// Declared names in order.
        names: Vec<String>,
        /// Explicit type of the first spec, if it is a plain type name.
        type_name: Option<String>,
    },
}

/// Read and parse every file of a package, then collect examples from its
/// test files. Test files of the package itself and of its external
/// `_test` package both count; unreadable ones are skipped with a warning.
///
/// # Errors
///
/// Returns `Error::Io` if a file cannot be read, or `Error::ParseFailed` if
/// no file has a `package` clause.
pub fn parse_package(package: &PackageRef) -> Result<Package, Error> {
    let mut parsed = Package {
        decls: Vec::new(),
        doc: String::new(),
        examples: Vec::new(),
        import_path: package.import_path.clone(),
        imports: Vec::new(),
        name: String::new(),
        top_level: HashSet::new(),
    };

    for path in &package.files {
        let content = std::fs::read_to_string(path)?;
        let file = parsed.imports.len();
        parse_file(path, &content, file, &mut parsed)?;
    }

    if parsed.name.is_empty() {
        return Err(Error::ParseFailed {
            file: package.files.first().cloned().unwrap_or_default(),
            reason: "no package clause".to_owned(),
        });
    }

    for path in &package.test_files {
        let parsed_test = std::fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|content| return parse_examples(path, &content));
        let (name, examples) = match parsed_test {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping test file");
                continue;
            },
        };
        if name != parsed.name && name.strip_suffix("_test") != Some(parsed.name.as_str()) {
            tracing::debug!(
                path = %path.display(),
                package = %name,
                "Test file of another package"
            );
            continue;
        }
        parsed.examples.extend(examples);
    }
    return Ok(parsed);
}

/// Parse one file into `package`. `file` is its index.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if tree-sitter cannot parse the file.
fn parse_file(path: &Path, source: &str, file: usize, package: &mut Package) -> Result<(), Error> {
    let tree = grammar::parse(path, source)?;
    let root = tree.root_node();
    if root.has_error() {
        tracing::debug!(path = %path.display(), "Syntax errors; documenting what parsed");
    }

    let mut imports = HashMap::new();
    for node in grammar::named_children(root) {
        match node.kind() {
            "package_clause" => {
                if package.name.is_empty() {
                    package.name = package_name(node, source);
                }
                if package.doc.is_empty() {
                    package.doc = doc_comment(node, source);
                }
            },
            "import_declaration" => collect_imports(node, source, &mut imports),
            "function_declaration" | "method_declaration" => {
                if let Some(decl) = function_decl(node, source, file) {
                    if let DeclKind::Func { name, .. } = &decl.kind {
                        if name != "init" {
                            package.top_level.insert(name.clone());
                        }
                    }
                    package.decls.push(decl);
                }
            },
            "type_declaration" => {
                for decl in type_decls(node, source, file) {
                    if let DeclKind::Type { name } = &decl.kind {
                        package.top_level.insert(name.clone());
                    }
                    package.decls.push(decl);
                }
            },
            "const_declaration" | "var_declaration" => {
                let decl = value_decl(node, source, file);
                if let DeclKind::Const { names, .. } | DeclKind::Var { names, .. } = &decl.kind {
                    package.top_level.extend(names.iter().filter(|n| return *n != "_").cloned());
                }
                package.decls.push(decl);
            },
            _ => {},
        }
    }

    package.imports.push(imports);
    return Ok(());
}

/// Name in a `package` clause.
fn package_name(clause: Node<'_>, source: &str) -> String {
    return grammar::named_children(clause)
        .into_iter()
        .find(|n| return n.kind() == "package_identifier")
        .map(|n| return grammar::text(n, source).to_owned())
        .unwrap_or_default();
}

/// Package name and `Example` functions of a test file.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if tree-sitter cannot parse the file.
fn parse_examples(path: &Path, source: &str) -> Result<(String, Vec<Example>), Error> {
    let tree = grammar::parse(path, source)?;
    let mut name = String::new();
    let mut examples = Vec::new();
    for node in grammar::named_children(tree.root_node()) {
        match node.kind() {
            "package_clause" => name = package_name(node, source),
            "function_declaration" => examples.extend(example(node, source)),
            _ => {},
        }
    }
    return Ok((name, examples));
}

/// An example function: named `Example` or `ExampleXxx` (not `Examplexxx`),
/// without parameters, results or type parameters, and with a body.
fn example(node: Node<'_>, source: &str) -> Option<Example> {
    let name = grammar::text(node.child_by_field_name("name")?, source);
    let rest = name.strip_prefix("Example")?;
    if rest.chars().next().is_some_and(char::is_lowercase) {
        return None;
    }
    let params = node.child_by_field_name("parameters")?;
    let has_params = grammar::named_children(params)
        .iter()
        .any(|p| return p.kind() != "comment");
    let has_results = node.child_by_field_name("result").is_some();
    let is_generic = node.child_by_field_name("type_parameters").is_some();
    if has_params || has_results || is_generic {
        return None;
    }
    let body = node.child_by_field_name("body")?;
    let (code, output) = example_body(body, source);
    return Some(Example {
        code,
        doc: doc_comment(node, source),
        name: rest.to_owned(),
        output,
    });
}

/// Display code and expected output of an example body.
///
/// The last comment group is the expected output if it starts with
/// `Output:` or `Unordered output:`. It is cut from the code along with
/// anything after it.
fn example_body(body: Node<'_>, source: &str) -> (String, Option<String>) {
    let mut comments = Vec::new();
    descendants(body, "comment", &mut comments);
    let mut raw_strings = Vec::new();
    descendants(body, "raw_string_literal", &mut raw_strings);

    let start = body.start_byte().saturating_add(1);
    let mut end = body.end_byte().saturating_sub(1);
    let mut output = None;

    let group = last_comment_group(&comments, source);
    let text: Vec<&str> = group
        .iter()
        .flat_map(|c| return comment_lines(grammar::text(*c, source)))
        .collect();
    let text = text.join("\n");
    if let Some(found) = OUTPUT.find(&text) {
        let rest = text.get(found.end()..).unwrap_or("").trim_start_matches(' ');
        let rest = rest.strip_prefix('\n').unwrap_or(rest);
        output = Some(rest.trim_end().to_owned());
        end = group.first().map_or(end, |c| return c.start_byte());
    }

    let inner = source.get(start..end.max(start)).unwrap_or("");
    let ranges: Vec<(usize, usize)> = raw_strings
        .iter()
        .map(|r| return (r.start_byte(), r.end_byte()))
        .collect();
    return (dedent(inner, start, &ranges), output);
}

/// The trailing run of comments on consecutive lines, in order.
fn last_comment_group<'t>(comments: &[Node<'t>], source: &str) -> Vec<Node<'t>> {
    let mut group: Vec<Node<'t>> = Vec::new();
    for comment in comments.iter().rev() {
        if let Some(next) = group.last() {
            let between = source.get(comment.end_byte()..next.start_byte()).unwrap_or("x");
            let next_row = next.start_position().row;
            let adjacent = comment.end_position().row.saturating_add(1) == next_row;
            if !adjacent || !between.trim().is_empty() {
                break;
            }
        }
        group.push(*comment);
    }
    group.reverse();
    return group;
}

/// Remove the indentation of the first non-blank line from every line,
/// leaving lines that start inside a raw string alone. `base` is the
/// offset of `text` in the file; `raw_strings` are file offsets.
fn dedent(text: &str, base: usize, raw_strings: &[(usize, usize)]) -> String {
    let text = text.trim_end();
    let first = text.lines().find(|l| return !l.trim().is_empty()).unwrap_or("");
    let indent = first
        .get(..first.len().saturating_sub(first.trim_start().len()))
        .unwrap_or("");

    let mut lines = Vec::new();
    let mut offset = base;
    for line in text.split('\n') {
        let in_raw = raw_strings
            .iter()
            .any(|&(start, end)| return start < offset && offset < end);
        lines.push(if in_raw {
            line
        } else {
            line.strip_prefix(indent).unwrap_or_else(|| return line.trim_start())
        });
        offset = offset.saturating_add(line.len()).saturating_add(1);
    }
    return lines.join("\n").trim_start_matches('\n').to_owned();
}

/// Every descendant of `node` of the given kind, in source order.
fn descendants<'t>(node: Node<'t>, kind: &str, out: &mut Vec<Node<'t>>) {
    for child in grammar::named_children(node) {
        if child.kind() == kind {
            out.push(child);
        }
        descendants(child, kind, out);
    }
}

/// Add the imports of an `import` declaration to `imports`.
/// Dot and blank imports bind no name and are skipped.
fn collect_imports(node: Node<'_>, source: &str, imports: &mut HashMap<String, String>) {
    for child in grammar::named_children(node) {
        if child.kind() == "import_spec_list" {
            collect_imports(child, source, imports);
            continue;
        }
        if child.kind() != "import_spec" {
            continue;
        }
        let Some(path_node) = child.child_by_field_name("path") else {
            continue;
        };
        let path = unquote(grammar::text(path_node, source));
        let name = match child.child_by_field_name("name") {
            Some(alias) if alias.kind() == "package_identifier" => {
                grammar::text(alias, source).to_owned()
            },
            Some(_) => continue,
            None => import_name(path),
        };
        imports.insert(name, path.to_owned());
    }
}

/// Best guess at the package name behind an import path.
///
/// The last path element, ignoring a `/vN` major version element, a
/// `.vN` suffix (gopkg.in), and `go-` or `-go` decorations.
pub fn import_name(path: &str) -> String {
    let mut segments = path.rsplit('/');
    let mut last = segments.next().unwrap_or(path);
    if is_major_version(last) {
        if let Some(prev) = segments.next() {
            last = prev;
        }
    }
    if let Some((base, version)) = last.rsplit_once('.') {
        if is_major_version(version) {
            last = base;
        }
    }
    let last = last.strip_prefix("go-").unwrap_or(last);
    let last = last.strip_suffix("-go").unwrap_or(last);
    return last.to_owned();
}

/// Whether `s` looks like `v2`, `v10`.
fn is_major_version(s: &str) -> bool {
    return s
        .strip_prefix('v')
        .is_some_and(|n| return !n.is_empty() && n.chars().all(|c| return c.is_ascii_digit()));
}

/// A function or method declaration, without its body.
fn function_decl(node: Node<'_>, source: &str, file: usize) -> Option<Decl> {
    let name = grammar::text(node.child_by_field_name("name")?, source).to_owned();
    let end = node.child_by_field_name("body").map_or(node.end_byte(), |b| return b.start_byte());
    let text = source.get(node.start_byte()..end)?.trim_end().to_owned();

    let kind = if node.kind() == "method_declaration" {
        let receiver = node.child_by_field_name("receiver")?;
        let param = grammar::named_children(receiver)
            .into_iter()
            .find(|n| return n.kind() == "parameter_declaration")?;
        let recv = base_type_name(param.child_by_field_name("type")?, source)?;
        DeclKind::Method { name, recv }
    } else {
        let result_type = node
            .child_by_field_name("result")
            .and_then(|r| return first_result_type(r, source));
        DeclKind::Func { name, result_type }
    };

    return Some(Decl {
        doc: doc_comment(node, source),
        file,
        kind,
        text,
    });
}

/// The type named by a function's first result.
fn first_result_type(result: Node<'_>, source: &str) -> Option<String> {
    if result.kind() != "parameter_list" {
        return base_type_name(result, source);
    }
    let first = grammar::named_children(result)
        .into_iter()
        .find(|n| return n.kind() == "parameter_declaration")?;
    return base_type_name(first.child_by_field_name("type")?, source);
}

/// `T` for `T`, `*T`, `T[X]`, and `*T[X]`. `None` for anything else.
fn base_type_name(node: Node<'_>, source: &str) -> Option<String> {
    return match node.kind() {
        "type_identifier" => Some(grammar::text(node, source).to_owned()),
        "pointer_type" | "parenthesized_type" => {
            let inner = grammar::named_children(node).into_iter().last()?;
            base_type_name(inner, source)
        },
        "generic_type" => base_type_name(node.child_by_field_name("type")?, source),
        _ => None,
    };
}

/// Declarations from a `type` declaration: one per spec.
fn type_decls(node: Node<'_>, source: &str, file: usize) -> Vec<Decl> {
    let specs: Vec<Node<'_>> = spec_nodes(node, &["type_spec", "type_alias"]);
    let grouped = grammar::children(node).iter().any(|c| return c.kind() == "(");
    let decl_doc = doc_comment(node, source);

    return specs
        .into_iter()
        .filter_map(|spec| {
            let name = grammar::text(spec.child_by_field_name("name")?, source).to_owned();
            let (text, doc) = if grouped {
                let spec_doc = doc_comment(spec, source);
                let doc = if spec_doc.is_empty() && specs_len_is_one(node) {
                    decl_doc.clone()
                } else {
                    spec_doc
                };
                (lift_spec(spec, source), doc)
            } else {
                (grammar::text(node, source).to_owned(), decl_doc.clone())
            };
            return Some(Decl {
                doc,
                file,
                kind: DeclKind::Type { name },
                text,
            });
        })
        .collect();
}

/// Re-emit a spec from a `type ( ... )` group as a standalone declaration,
/// removing the group's indentation.
fn lift_spec(spec: Node<'_>, source: &str) -> String {
    let start = spec.start_byte();
    let line_start = source
        .get(..start)
        .and_then(|before| return before.rfind('\n'))
        .map_or(0, |i| return i.saturating_add(1));
    let indent = source.get(line_start..start).unwrap_or("");
    let indent = if indent.chars().all(char::is_whitespace) { indent } else { "" };

    let body: Vec<&str> = grammar::text(spec, source)
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                return line;
            }
            return line.strip_prefix(indent).unwrap_or(line);
        })
        .collect();
    return format!("type {}", body.join("\n"));
}

/// Whether a grouped declaration holds exactly one spec.
fn specs_len_is_one(node: Node<'_>) -> bool {
    return spec_nodes(node, &["type_spec", "type_alias"]).len() == 1;
}

/// Spec nodes of the given kinds directly inside `node` or one of its
/// spec list children.
fn spec_nodes<'t>(node: Node<'t>, kinds: &[&str]) -> Vec<Node<'t>> {
    let mut specs = Vec::new();
    for child in grammar::named_children(node) {
        if kinds.contains(&child.kind()) {
            specs.push(child);
        } else if child.kind().ends_with("_spec_list") {
            specs.extend(spec_nodes(child, kinds));
        }
    }
    return specs;
}

/// A `const` or `var` declaration, kept whole.
fn value_decl(node: Node<'_>, source: &str, file: usize) -> Decl {
    let (spec_kind, is_const) = if node.kind() == "const_declaration" {
        ("const_spec", true)
    } else {
        ("var_spec", false)
    };
    let specs = spec_nodes(node, &[spec_kind]);

    let mut names = Vec::new();
    for spec in &specs {
        let mut cursor = spec.walk();
        names.extend(
            spec.children_by_field_name("name", &mut cursor)
                .map(|n| return grammar::text(n, source).to_owned()),
        );
    }
    let type_name = specs
        .first()
        .and_then(|s| return s.child_by_field_name("type"))
        .and_then(|t| return base_type_name(t, source));

    let kind = if is_const {
        DeclKind::Const { names, type_name }
    } else {
        DeclKind::Var { names, type_name }
    };
    return Decl {
        doc: doc_comment(node, source),
        file,
        kind,
        text: grammar::text(node, source).to_owned(),
    };
}

/// The comment group directly above `node`, markers removed.
///
/// A blank line ends the group, as does a comment trailing other code on
/// its line. Tool directives (`//go:generate`) are dropped.
fn doc_comment(node: Node<'_>, source: &str) -> String {
    let mut comments = Vec::new();
    let mut next_row = node.start_position().row;
    let mut current = node.prev_named_sibling();

    while let Some(prev) = current {
        if prev.kind() != "comment" || prev.end_position().row.saturating_add(1) < next_row {
            break;
        }
        let trailing = prev.prev_named_sibling().is_some_and(|before| {
            let same_row = before.end_position().row == prev.start_position().row;
            return before.kind() != "comment" && same_row;
        });
        if trailing {
            break;
        }
        comments.push(grammar::text(prev, source));
        next_row = prev.start_position().row;
        current = prev.prev_named_sibling();
    }

    comments.reverse();
    let lines: Vec<&str> = comments.into_iter().flat_map(comment_lines).collect();
    return lines.join("\n").trim().to_owned();
}

/// Text lines of one comment, markers removed.
fn comment_lines(comment: &str) -> Vec<&str> {
    if let Some(line) = comment.strip_prefix("//") {
        if line.starts_with("go:") || line.starts_with("line ") {
            return Vec::new();
        }
        return vec![line.strip_prefix(' ').unwrap_or(line)];
    }
    let inner = comment.strip_prefix("/*").unwrap_or(comment);
    let inner = inner.strip_suffix("*/").unwrap_or(inner);
    return inner.lines().map(str::trim).collect();
}

/// Remove the quotes around a Go string literal.
fn unquote(literal: &str) -> &str {
    return literal
        .strip_prefix('"')
        .and_then(|s| return s.strip_suffix('"'))
        .or_else(|| return literal.strip_prefix('`').and_then(|s| return s.strip_suffix('`')))
        .unwrap_or(literal);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Package {
        let mut package = Package {
            decls: Vec::new(),
            doc: String::new(),
            examples: Vec::new(),
            import_path: "example.com/p".to_owned(),
            imports: Vec::new(),
            name: String::new(),
            top_level: HashSet::new(),
        };
        parse_file(Path::new("p.go"), source, 0, &mut package).unwrap();
        package
    }

    const SOURCE: &str = r#"// Package p does things.
//
// It does them well.
package p

import (
	"context"
	"fmt"
	yaml "gopkg.in/yaml.v3"
	_ "embed"
	. "strings"
	"github.com/x/y/v2"
)

//go:generate stringer -type Kind

// Kind is a kind.
type Kind int

// Kinds.
const (
	A Kind = iota // first
	B
)

var debug = false

type (
	// Options configures things.
	Options struct {
		Name string
	}

	handler func()
)

// New builds Options.
func New(ctx context.Context) (*Options, error) {
	return &Options{}, nil
}

// String implements fmt.Stringer.
func (k *Kind) String() string {
	return fmt.Sprint(int(*k))
}

func init() {}
"#;

    #[test]
    fn package_clause_and_doc() {
        let package = parse(SOURCE);
        assert_eq!(package.name, "p");
        assert_eq!(package.doc, "Package p does things.\n\nIt does them well.");
    }

    #[test]
    fn import_table() {
        let package = parse(SOURCE);
        let imports = &package.imports[0];
        assert_eq!(imports.get("context").map(String::as_str), Some("context"));
        assert_eq!(imports.get("yaml").map(String::as_str), Some("gopkg.in/yaml.v3"));
        assert_eq!(imports.get("y").map(String::as_str), Some("github.com/x/y/v2"));
        assert!(!imports.contains_key("_"));
        assert!(!imports.contains_key("strings"));
        assert!(!imports.contains_key("embed"));
    }

    #[test]
    fn top_level_names() {
        let package = parse(SOURCE);
        let mut names: Vec<&str> = package.top_level.iter().map(String::as_str).collect();
        names.sort_unstable();
        assert_eq!(names, ["A", "B", "Kind", "New", "Options", "debug", "handler"]);
    }

    #[test]
    fn declarations_and_docs() {
        let package = parse(SOURCE);
        let summary: Vec<(&DeclKind, &str)> = package
            .decls
            .iter()
            .map(|d| (&d.kind, d.doc.as_str()))
            .collect();

        assert_eq!(summary[0], (&DeclKind::Type { name: "Kind".to_owned() }, "Kind is a kind."));
        assert_eq!(
            summary[1],
            (
                &DeclKind::Const {
                    names: vec!["A".to_owned(), "B".to_owned()],
                    type_name: Some("Kind".to_owned()),
                },
                "Kinds."
            )
        );
        assert_eq!(
            summary[2],
            (
                &DeclKind::Var {
                    names: vec!["debug".to_owned()],
                    type_name: None,
                },
                ""
            )
        );
        assert_eq!(
            summary[3],
            (&DeclKind::Type { name: "Options".to_owned() }, "Options configures things.")
        );
        assert_eq!(summary[4], (&DeclKind::Type { name: "handler".to_owned() }, ""));
        assert_eq!(
            summary[5],
            (
                &DeclKind::Func {
                    name: "New".to_owned(),
                    result_type: Some("Options".to_owned()),
                },
                "New builds Options."
            )
        );
        assert_eq!(
            summary[6],
            (
                &DeclKind::Method {
                    name: "String".to_owned(),
                    recv: "Kind".to_owned(),
                },
                "String implements fmt.Stringer."
            )
        );
    }

    #[test]
    fn declaration_text() {
        let package = parse(SOURCE);
        let text: Vec<&str> = package.decls.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(text[0], "type Kind int");
        assert_eq!(text[1], "const (\n\tA Kind = iota // first\n\tB\n)");
        assert_eq!(text[3], "type Options struct {\n\tName string\n}");
        assert_eq!(text[5], "func New(ctx context.Context) (*Options, error)");
        assert_eq!(text[6], "func (k *Kind) String() string");
    }

    #[test]
    fn directive_only_comment_is_no_doc() {
        let package = parse("package p\n\n//go:noinline\nfunc F() {}\n");
        assert_eq!(package.decls[0].doc, "");
    }

    #[test]
    fn blank_line_separates_doc() {
        let package = parse("package p\n\n// Not a doc.\n\nfunc F() {}\n");
        assert_eq!(package.decls[0].doc, "");
    }

    #[test]
    fn generic_receiver() {
        let package =
            parse("package p\n\ntype List[T any] struct{}\n\nfunc (l *List[T]) Push(v T) {}\n");
        assert_eq!(
            package.decls[1].kind,
            DeclKind::Method {
                name: "Push".to_owned(),
                recv: "List".to_owned(),
            }
        );
        assert_eq!(package.decls[1].text, "func (l *List[T]) Push(v T)");
    }

    #[test]
    fn import_names() {
        let cases = [
            ("fmt", "fmt"),
            ("net/http", "http"),
            ("github.com/x/y/v2", "y"),
            ("gopkg.in/yaml.v3", "yaml"),
            ("example.com/bar-go", "bar"),
            ("github.com/mattn/go-sqlite3", "sqlite3"),
        ];
        for (path, want) in cases {
            assert_eq!(import_name(path), want, "{path}");
        }
    }

    #[test]
    fn reads_package_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.go");
        let b = dir.path().join("b.go");
        std::fs::write(&a, "package q\n\nfunc A() {}\n").unwrap();
        let b_source = "// Package q.\npackage q\n\nimport \"io\"\n\nvar B io.Reader\n";
        std::fs::write(&b, b_source).unwrap();

        let package = parse_package(&PackageRef {
            files: vec![a, b],
            import_path: "example.com/q".to_owned(),
            module: None,
            name: "q".to_owned(),
            test_files: Vec::new(),
        })
        .unwrap();
        assert_eq!(package.name, "q");
        assert_eq!(package.doc, "Package q.");
        assert_eq!(package.imports.len(), 2);
        assert!(package.imports[0].is_empty());
        assert_eq!(package.imports[1].get("io").map(String::as_str), Some("io"));
        assert_eq!(package.decls[1].file, 1);
    }

    #[test]
    fn missing_package_clause_fails() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.go");
        std::fs::write(&a, "func A() {}\n").unwrap();
        let err = parse_package(&PackageRef {
            files: vec![a],
            import_path: "example.com/q".to_owned(),
            module: None,
            name: "q".to_owned(),
            test_files: Vec::new(),
        })
        .unwrap_err();
        assert!(matches!(err, Error::ParseFailed { .. }), "{err}");
    }

    const EXAMPLES: &str = r#"package q_test

import (
	"fmt"

	"example.com/q"
)

// Shows the basics.
func Example() {
	fmt.Println(q.A())
	// Output: a
}

func ExampleA_twice() {
	s := `raw
  kept`
	for i := 0; i < 2; i++ {
		fmt.Println(s)
	}
	// Unordered output:
	// a
	// b
}

func ExampleT_Method() {
	q.T{}.Method() // no output
}

func Examplelower() {}

func ExampleArgs(x int) {}

func helper() {}
"#;

    #[test]
    fn reads_examples_from_test_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("q.go");
        let external = dir.path().join("example_test.go");
        let other = dir.path().join("other_test.go");
        std::fs::write(&src, "package q\n\nfunc A() string { return \"a\" }\n").unwrap();
        std::fs::write(&external, EXAMPLES).unwrap();
        std::fs::write(&other, "package other\n\nfunc ExampleA() {}\n").unwrap();

        let package = parse_package(&PackageRef {
            files: vec![src],
            import_path: "example.com/q".to_owned(),
            module: None,
            name: "q".to_owned(),
            test_files: vec![external, other],
        })
        .unwrap();

        let names: Vec<&str> = package.examples.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["", "A_twice", "T_Method"]);

        let basic = &package.examples[0];
        assert_eq!(basic.doc, "Shows the basics.");
        assert_eq!(basic.code, "fmt.Println(q.A())");
        assert_eq!(basic.output.as_deref(), Some("a"));

        let twice = &package.examples[1];
        assert_eq!(
            twice.code,
            "s := `raw\n  kept`\nfor i := 0; i < 2; i++ {\n\tfmt.Println(s)\n}"
        );
        assert_eq!(twice.output.as_deref(), Some("a\nb"));

        let method = &package.examples[2];
        assert_eq!(method.code, "q.T{}.Method() // no output");
        assert_eq!(method.output, None);
    }
}
