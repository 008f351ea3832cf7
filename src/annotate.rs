//! Declaration annotation: which parts of a declaration's source are anchors,
//! cross-references, or comments.
//!
//! Two independent passes run over the same text. The structural pass walks
//! the tree-sitter tree and makes one labeling decision per identifier. The
//! lexical pass re-tokenizes the text and hands those decisions out, in
//! order, to the identifier tokens it finds. The passes must agree on how
//! many identifiers there are.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tree_sitter::Node;

use crate::error::Error;
use crate::grammar;
use crate::lexer::{self, Token, TokenKind};

/// Import path given to [`Label::EntityRef`] for Go's predeclared identifiers.
pub const BUILTIN: &str = "builtin";

/// Leaf node kinds the lexer reports as identifiers.
const IDENT_KINDS: [&str; 10] = [
    "blank_identifier",
    "false",
    "field_identifier",
    "identifier",
    "iota",
    "label_name",
    "nil",
    "package_identifier",
    "true",
    "type_identifier",
];

/// Identifiers of Go's universe scope.
const PREDECLARED: [&str; 44] = [
    "any",
    "append",
    "bool",
    "byte",
    "cap",
    "clear",
    "close",
    "comparable",
    "complex",
    "complex128",
    "complex64",
    "copy",
    "delete",
    "error",
    "false",
    "float32",
    "float64",
    "imag",
    "int",
    "int16",
    "int32",
    "int64",
    "int8",
    "iota",
    "len",
    "make",
    "max",
    "min",
    "new",
    "nil",
    "panic",
    "print",
    "println",
    "real",
    "recover",
    "rune",
    "string",
    "true",
    "uint",
    "uint16",
    "uint32",
    "uint64",
    "uint8",
    "uintptr",
];

/// What is special about a [`Region`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    /// A comment.
    Comment,
    /// Declaration site of a struct field, interface method, var, or const.
    Decl {
        /// Declared name.
        name: String,
        /// Type the name is declared inside. `None` for vars and consts.
        parent: Option<String>,
    },
    /// Reference to a named entity.
    EntityRef {
        /// Package defining the entity: `None` for this package,
        /// [`BUILTIN`] for predeclared identifiers.
        import_path: Option<String>,
        /// Entity name.
        name: String,
    },
    /// Reference to an imported package by its local name.
    PackageRef {
        /// Import path of the package.
        import_path: String,
    },
}

/// Labeled byte range of a formatted declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// What this range is.
    pub label: Label,
    /// Length in bytes.
    pub length: usize,
    /// Start offset in bytes.
    pub offset: usize,
}

/// Structural verdict for one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Plain text.
    Ignore,
    /// Labeled region.
    Label(Label),
}

/// How to react when the two passes disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Panic with both passes' output. For debugging.
    Diagnostic,
    /// Keep the regions labeled so far, log a warning, render the rest plain.
    #[default]
    Lenient,
}

/// The passes found different numbers of identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{decisions} labeling decisions for {identifiers} identifiers")]
pub struct Misalignment {
    /// Decisions made by the structural pass.
    pub decisions: usize,
    /// Identifier tokens found by the lexical pass.
    pub identifiers: usize,
}

/// A declaration's display text and its labeled regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedDecl {
    /// Regions in order. They never overlap.
    pub regions: Vec<Region>,
    /// Canonical source text the regions index into.
    pub source: String,
}

/// Formats and annotates declarations of one package.
///
/// Reusable across the declarations of a file, but not across packages.
pub struct DeclFormatter<'p> {
    /// Local import name to import path, for the declaring file.
    imports: &'p HashMap<String, String>,
    /// Reaction to pass disagreement.
    strictness: Strictness,
    /// Names declared at package scope.
    top_level: &'p HashSet<String>,
}

/// Structural pass state.
struct Labeler<'a> {
    /// Decisions made so far, in source order.
    decisions: Vec<Decision>,
    /// Local import name to import path.
    imports: &'a HashMap<String, String>,
    /// Names bound inside this declaration: type parameters.
    locals: HashSet<String>,
    /// Declaration text.
    source: &'a str,
    /// Names declared at package scope.
    top_level: &'a HashSet<String>,
}

impl<'p> DeclFormatter<'p> {
    /// Annotate `text`, a single declaration.
    ///
    /// # Errors
    ///
    /// Returns `Error::ParseFailed` if tree-sitter cannot parse the text.
    ///
    /// # Panics
    ///
    /// Panics under [`Strictness::Diagnostic`] if the two passes disagree.
    pub fn format_decl(&self, text: &str) -> Result<FormattedDecl, Error> {
        let source = canonicalize(text);
        let tree = grammar::parse(Path::new("<declaration>"), &source)?;

        let mut labeler = Labeler {
            decisions: Vec::new(),
            imports: self.imports,
            locals: HashSet::new(),
            source: &source,
            top_level: self.top_level,
        };
        labeler.bind_locals(tree.root_node());
        labeler.walk(tree.root_node(), None);
        let decisions = labeler.decisions;

        let tokens = lexer::tokenize(&source);
        let regions = align(decisions, &tokens, self.strictness, &source);
        return Ok(FormattedDecl { regions, source });
    }

    /// Create a formatter for one file of a package.
    pub fn new(
        top_level: &'p HashSet<String>,
        imports: &'p HashMap<String, String>,
        strictness: Strictness,
    ) -> Self {
        return Self {
            imports,
            strictness,
            top_level,
        };
    }
}

impl<'a> Labeler<'a> {
    /// Record type parameter names, which are in scope for the whole
    /// declaration. Function parameters are not: their scope is the body.
    fn bind_locals(&mut self, node: Node<'_>) {
        match node.kind() {
            "type_parameter_declaration" => {
                let mut cursor = node.walk();
                for name in node.children_by_field_name("name", &mut cursor) {
                    self.locals.insert(grammar::text(name, self.source).to_owned());
                }
            },
            "method_declaration" => {
                if let Some(receiver) = node.child_by_field_name("receiver") {
                    self.bind_receiver_type_args(receiver, false);
                }
            },
            _ => {},
        }
        for child in grammar::named_children(node) {
            self.bind_locals(child);
        }
    }

    /// Bind the type arguments of a generic receiver: `T` in `(l *List[T])`.
    fn bind_receiver_type_args(&mut self, node: Node<'_>, in_args: bool) {
        let in_args = in_args || node.kind() == "type_arguments";
        if in_args && node.kind() == "type_identifier" {
            self.locals.insert(grammar::text(node, self.source).to_owned());
        }
        for child in grammar::named_children(node) {
            self.bind_receiver_type_args(child, in_args);
        }
    }

    /// Decide what an identifier reference is.
    fn classify(&self, name: &str) -> Decision {
        if name == "_" || self.locals.contains(name) {
            return Decision::Ignore;
        }
        if self.top_level.contains(name) {
            if !is_exported(name) {
                return Decision::Ignore;
            }
            return Decision::Label(Label::EntityRef {
                import_path: None,
                name: name.to_owned(),
            });
        }
        if PREDECLARED.contains(&name) {
            return Decision::Label(Label::EntityRef {
                import_path: Some(BUILTIN.to_owned()),
                name: name.to_owned(),
            });
        }
        return Decision::Ignore;
    }

    /// Import path named by `node`, if it is an import name that nothing
    /// in this declaration shadows.
    fn package_of(&self, node: Node<'_>) -> Option<String> {
        if !matches!(node.kind(), "identifier" | "package_identifier") {
            return None;
        }
        let name = grammar::text(node, self.source);
        if self.locals.contains(name) {
            return None;
        }
        return self.imports.get(name).cloned();
    }

    /// Visit a child: decide leaves, descend into everything else.
    fn visit(&mut self, node: Node<'_>, parent: Option<&str>) {
        if IDENT_KINDS.contains(&node.kind()) {
            let decision = self.classify(grammar::text(node, self.source));
            self.decisions.push(decision);
            return;
        }
        self.walk(node, parent);
    }

    /// Walk `node` in source order. `parent` is the enclosing type name.
    fn walk(&mut self, node: Node<'_>, parent: Option<&str>) {
        match node.kind() {
            "comment" => {},
            "type_spec" | "type_alias" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| return grammar::text(n, self.source));
                self.walk_with_names(node, name, "name", |_| return Decision::Ignore);
            },
            "field_declaration" | "method_elem" | "method_spec" => {
                let owner = parent.map(str::to_owned);
                self.walk_with_names(node, parent, "name", |name| {
                    return Decision::Label(Label::Decl {
                        name: name.to_owned(),
                        parent: owner.clone(),
                    });
                });
            },
            "const_spec" | "var_spec" => {
                self.walk_with_names(node, parent, "name", |name| {
                    return Decision::Label(Label::Decl {
                        name: name.to_owned(),
                        parent: None,
                    });
                });
            },
            "function_declaration"
            | "method_declaration"
            | "parameter_declaration"
            | "variadic_parameter_declaration"
            | "type_parameter_declaration" => {
                self.walk_with_names(node, parent, "name", |_| return Decision::Ignore);
            },
            "keyed_element" => {
                let field = struct_field_key(node).map(|key| return key.id());
                for child in grammar::children(node) {
                    if Some(child.id()) == field {
                        self.decisions.push(Decision::Ignore);
                    } else {
                        self.visit(child, parent);
                    }
                }
            },
            "qualified_type" => self.walk_selector(node, parent, "package", "name"),
            "selector_expression" => self.walk_selector(node, parent, "operand", "field"),
            _ => {
                for child in grammar::children(node) {
                    self.visit(child, parent);
                }
            },
        }
    }

    /// Walk `pkg.Member`: a package reference plus an entity reference when
    /// `pkg` is an import, otherwise the base as usual and the member ignored.
    fn walk_selector(&mut self, node: Node<'_>, parent: Option<&str>, base: &str, member: &str) {
        let base_node = node.child_by_field_name(base);
        let member_node = node.child_by_field_name(member);
        if let (Some(base_node), Some(member_node)) = (base_node, member_node) {
            if let Some(import_path) = self.package_of(base_node) {
                let entity = if import_path == "C" {
                    Decision::Ignore
                } else {
                    Decision::Label(Label::EntityRef {
                        import_path: Some(import_path.clone()),
                        name: grammar::text(member_node, self.source).to_owned(),
                    })
                };
                self.decisions.push(Decision::Label(Label::PackageRef { import_path }));
                self.decisions.push(entity);
                return;
            }
        }
        self.walk_with_names(node, parent, member, |_| return Decision::Ignore);
    }

    /// Walk the children of `node`, deciding children in `field` with
    /// `decide` and everything else as usual.
    fn walk_with_names(
        &mut self,
        node: Node<'_>,
        parent: Option<&str>,
        field: &str,
        decide: impl Fn(&str) -> Decision,
    ) {
        let names: HashSet<usize> = {
            let mut cursor = node.walk();
            node.children_by_field_name(field, &mut cursor)
                .map(|n| return n.id())
                .collect()
        };
        for child in grammar::children(node) {
            if names.contains(&child.id()) && IDENT_KINDS.contains(&child.kind()) {
                let decision = decide(grammar::text(child, self.source));
                self.decisions.push(decision);
            } else {
                self.visit(child, parent);
            }
        }
    }
}

/// The key of a `keyed_element` when it names a struct field: a lone
/// identifier in a literal whose type is not a map, slice or array.
/// Named and elided literal types are assumed to be structs.
fn struct_field_key(node: Node<'_>) -> Option<Node<'_>> {
    const INDEXED: [&str; 4] =
        ["array_type", "implicit_length_array_type", "map_type", "slice_type"];

    let key = node.child_by_field_name("key")?;
    let ident = if key.kind() == "literal_element" {
        let inner = grammar::named_children(key);
        match inner.as_slice() {
            [only] => *only,
            _ => return None,
        }
    } else {
        key
    };
    if ident.kind() != "identifier" {
        return None;
    }

    let literal = node.parent().and_then(|value| return value.parent());
    if let Some(literal) = literal.filter(|l| return l.kind() == "composite_literal") {
        let indexed = literal
            .child_by_field_name("type")
            .is_some_and(|t| return INDEXED.contains(&t.kind()));
        if indexed {
            return None;
        }
    }
    return Some(key);
}

/// Normalize declaration text: LF line endings, no trailing whitespace.
pub fn canonicalize(text: &str) -> String {
    return text
        .replace("\r\n", "\n")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_owned();
}

/// Verify that there is exactly one decision per identifier token.
///
/// # Errors
///
/// Returns the two counts when they differ.
pub fn check_alignment(decisions: &[Decision], tokens: &[Token]) -> Result<(), Misalignment> {
    let identifiers = tokens.iter().filter(|t| return t.kind == TokenKind::Ident).count();
    if decisions.len() == identifiers {
        return Ok(());
    }
    return Err(Misalignment {
        decisions: decisions.len(),
        identifiers,
    });
}

/// Pair decisions with identifier tokens and turn comments into regions.
///
/// # Panics
///
/// Panics under [`Strictness::Diagnostic`] if the counts differ.
fn align(
    decisions: Vec<Decision>,
    tokens: &[Token],
    strictness: Strictness,
    source: &str,
) -> Vec<Region> {
    if let Err(misalignment) = check_alignment(&decisions, tokens) {
        match strictness {
            Strictness::Diagnostic => {
                panic!("{misalignment} in declaration:\n{source}\ndecisions: {decisions:#?}");
            },
            Strictness::Lenient => {
                tracing::warn!(
                    error = %misalignment,
                    declaration = source.lines().next().unwrap_or(""),
                    "Declaration links may be incomplete; rerun with --debug to investigate"
                );
            },
        }
    }

    let mut regions = Vec::new();
    let mut decisions = decisions.into_iter();
    for token in tokens {
        let label = match token.kind {
            TokenKind::Comment => Some(Label::Comment),
            TokenKind::Ident => match decisions.next() {
                Some(Decision::Label(label)) => Some(label),
                Some(Decision::Ignore) => None,
                None => break,
            },
            TokenKind::Keyword | TokenKind::Other => None,
        };
        if let Some(label) = label {
            regions.push(Region {
                label,
                length: token.range.len(),
                offset: token.range.start,
            });
        }
    }
    return regions;
}

/// Whether a Go identifier is exported.
fn is_exported(name: &str) -> bool {
    return name.chars().next().is_some_and(char::is_uppercase);
}
