//! Turning a parsed package into the documentation model: exported
//! declarations only, grouped under the types they belong to, with
//! examples attached by name.

use std::collections::HashMap;

use crate::annotate::{DeclFormatter, Strictness};
use crate::code::{Code, CodeBuilder, FORMAT_FAILED};
use crate::link::LinkResolver;
use crate::source::{Decl, DeclKind, Package};

/// Documentation for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocPackage {
    /// Constants not associated with a type.
    pub constants: Vec<DocValue>,
    /// Package doc comment.
    pub doc: String,
    /// Package-level examples.
    pub examples: Vec<DocExample>,
    /// Functions not associated with a type, by name.
    pub functions: Vec<DocFunction>,
    /// Import path.
    pub import_path: String,
    /// Package name.
    pub name: String,
    /// First sentence of the doc comment.
    pub synopsis: String,
    /// Exported types, by name.
    pub types: Vec<DocType>,
    /// Variables not associated with a type.
    pub variables: Vec<DocValue>,
}

/// An exported type and everything associated with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocType {
    /// Constants of this type.
    pub constants: Vec<DocValue>,
    /// Declaration.
    pub decl: Code,
    /// Doc comment.
    pub doc: String,
    /// Examples for the type itself.
    pub examples: Vec<DocExample>,
    /// Constructors: functions returning this type.
    pub functions: Vec<DocFunction>,
    /// Methods, by name.
    pub methods: Vec<DocFunction>,
    /// Type name.
    pub name: String,
    /// Variables of this type.
    pub variables: Vec<DocValue>,
}

/// A `const` or `var` declaration, possibly grouped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocValue {
    /// Declaration.
    pub decl: Code,
    /// Doc comment.
    pub doc: String,
    /// Exported names it declares.
    pub names: Vec<String>,
}

/// A function or method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocFunction {
    /// Declaration, without body.
    pub decl: Code,
    /// Doc comment.
    pub doc: String,
    /// Examples for this function or method.
    pub examples: Vec<DocExample>,
    /// Function name.
    pub name: String,
    /// Receiver type for methods.
    pub recv: Option<String>,
}

/// A testable example.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocExample {
    /// Example body.
    pub code: Code,
    /// Doc comment.
    pub doc: String,
    /// Fragment identifier, e.g. `example-Shape.Draw-Twice`.
    pub id: String,
    /// Expected output. Empty when none is given.
    pub output: String,
    /// What the example is for: `package`, `Name` or `Recv.Name`.
    pub parent: String,
    /// Description following the parent, first letter capitalized. May be
    /// empty.
    pub suffix: String,
}

/// Where an example is attached, by position in the assembled package.
#[derive(Debug, Clone, Copy)]
enum ExampleOwner {
    /// A constructor: type index, then function index.
    Constructor(usize, usize),
    /// A package-level function.
    Function(usize),
    /// A method: type index, then method index.
    Method(usize, usize),
    /// The package.
    Package,
    /// A type.
    Type(usize),
}

/// Builds [`DocPackage`]s with links resolved through `R`.
pub struct Assembler<'a, R: LinkResolver> {
    /// Link destinations for declarations.
    resolver: &'a R,
    /// Annotation strictness.
    strictness: Strictness,
}

impl<'a, R: LinkResolver> Assembler<'a, R> {
    /// Assemble documentation for `package`.
    pub fn assemble(&self, package: &Package) -> DocPackage {
        let mut doc = DocPackage {
            doc: package.doc.clone(),
            import_path: package.import_path.clone(),
            name: package.name.clone(),
            synopsis: synopsis(&package.doc),
            ..DocPackage::default()
        };

        let mut types = self.types(package);
        let index: HashMap<String, usize> = types
            .iter()
            .enumerate()
            .map(|(i, t)| return (t.name.clone(), i))
            .collect();
        let owner = |name: Option<&String>| return name.and_then(|n| return index.get(n).copied());

        for decl in &package.decls {
            match &decl.kind {
                DeclKind::Type { .. } => {},
                DeclKind::Const { names, type_name } | DeclKind::Var { names, type_name } => {
                    let names: Vec<String> = names
                        .iter()
                        .filter(|n| return is_exported(n))
                        .cloned()
                        .collect();
                    if names.is_empty() {
                        continue;
                    }
                    let value = DocValue {
                        decl: self.code(package, decl),
                        doc: decl.doc.clone(),
                        names,
                    };
                    let is_const = matches!(decl.kind, DeclKind::Const { .. });
                    let target = owner(type_name.as_ref()).and_then(|i| return types.get_mut(i));
                    let slot = match (target, is_const) {
                        (Some(t), true) => &mut t.constants,
                        (Some(t), false) => &mut t.variables,
                        (None, true) => &mut doc.constants,
                        (None, false) => &mut doc.variables,
                    };
                    slot.push(value);
                },
                DeclKind::Func { name, result_type } => {
                    if !is_exported(name) {
                        continue;
                    }
                    let function = DocFunction {
                        decl: self.code(package, decl),
                        doc: decl.doc.clone(),
                        examples: Vec::new(),
                        name: name.clone(),
                        recv: None,
                    };
                    match owner(result_type.as_ref()).and_then(|i| return types.get_mut(i)) {
                        Some(t) => t.functions.push(function),
                        None => doc.functions.push(function),
                    }
                },
                DeclKind::Method { name, recv } => {
                    if !is_exported(name) {
                        continue;
                    }
                    let Some(t) = owner(Some(recv)).and_then(|i| return types.get_mut(i)) else {
                        continue;
                    };
                    t.methods.push(DocFunction {
                        decl: self.code(package, decl),
                        doc: decl.doc.clone(),
                        examples: Vec::new(),
                        name: name.clone(),
                        recv: Some(recv.clone()),
                    });
                },
            }
        }

        doc.functions.sort_by(|a, b| return a.name.cmp(&b.name));
        for t in &mut types {
            t.functions.sort_by(|a, b| return a.name.cmp(&b.name));
            t.methods.sort_by(|a, b| return a.name.cmp(&b.name));
        }
        doc.types = types;
        attach_examples(package, &mut doc);
        return doc;
    }

    /// Annotated code for one declaration. Formatting failures are logged
    /// and shown in place of the declaration.
    fn code(&self, package: &Package, decl: &Decl) -> Code {
        let no_imports = HashMap::new();
        let imports = package.imports.get(decl.file).unwrap_or(&no_imports);
        let formatter = DeclFormatter::new(&package.top_level, imports, self.strictness);

        return match formatter.format_decl(&decl.text) {
            Ok(formatted) => {
                CodeBuilder::new(&package.import_path, self.resolver).build(&formatted)
            },
            Err(e) => {
                tracing::warn!(
                    package = %package.import_path,
                    error = %e,
                    "Could not format declaration"
                );
                Code::error(FORMAT_FAILED, &e)
            },
        };
    }

    /// Create an assembler.
    pub fn new(resolver: &'a R, strictness: Strictness) -> Self {
        return Self { resolver, strictness };
    }

    /// Exported types, by name, without their associated declarations.
    fn types(&self, package: &Package) -> Vec<DocType> {
        let mut types: Vec<DocType> = package
            .decls
            .iter()
            .filter_map(|decl| {
                let DeclKind::Type { name } = &decl.kind else {
                    return None;
                };
                if !is_exported(name) {
                    return None;
                }
                return Some(DocType {
                    decl: self.code(package, decl),
                    doc: decl.doc.clone(),
                    name: name.clone(),
                    ..DocType::default()
                });
            })
            .collect();
        types.sort_by(|a, b| return a.name.cmp(&b.name));
        return types;
    }
}

/// Attach each example to the entity its name selects, following the
/// `go test` naming rules. Examples that match nothing are dropped.
fn attach_examples(package: &Package, doc: &mut DocPackage) {
    let ids = example_owners(doc);
    let mut found: Vec<(ExampleOwner, DocExample)> = Vec::new();
    for example in &package.examples {
        let Some((owner, parent, suffix)) = classify_example(&example.name, &ids) else {
            tracing::debug!(
                package = %package.import_path,
                example = %example.name,
                "Example matches nothing"
            );
            continue;
        };
        let suffix = capitalize(suffix);
        let id = if suffix.is_empty() {
            format!("example-{parent}")
        } else {
            format!("example-{parent}-{suffix}")
        };
        found.push((
            owner,
            DocExample {
                code: Code::highlight(&example.code),
                doc: example.doc.clone(),
                id,
                output: example.output.clone().unwrap_or_default(),
                parent: parent.to_owned(),
                suffix,
            },
        ));
    }

    found.sort_by(|a, b| return a.1.suffix.cmp(&b.1.suffix));
    for (owner, example) in found {
        let slot = match owner {
            ExampleOwner::Constructor(t, i) => doc
                .types
                .get_mut(t)
                .and_then(|t| return t.functions.get_mut(i))
                .map(|f| return &mut f.examples),
            ExampleOwner::Function(i) => doc.functions.get_mut(i).map(|f| return &mut f.examples),
            ExampleOwner::Method(t, i) => doc
                .types
                .get_mut(t)
                .and_then(|t| return t.methods.get_mut(i))
                .map(|m| return &mut m.examples),
            ExampleOwner::Package => Some(&mut doc.examples),
            ExampleOwner::Type(t) => doc.types.get_mut(t).map(|t| return &mut t.examples),
        };
        if let Some(slot) = slot {
            slot.push(example);
        }
    }
}

/// `s` with its first letter in upper case.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    return match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
}

/// Split an example name into an owner and a suffix.
///
/// The whole name is tried first, then every split at an underscore from
/// the right. A suffix must start with a lowercase letter. The first split
/// whose prefix names an entity wins.
fn classify_example<'n, 'i>(
    name: &'n str,
    ids: &'i HashMap<String, (ExampleOwner, String)>,
) -> Option<(ExampleOwner, &'i str, &'n str)> {
    let mut split = Some(name.len());
    while let Some(at) = split {
        let (prefix, suffix) = if at == name.len() {
            (name, "")
        } else {
            (name.get(..at)?, name.get(at.saturating_add(1)..)?)
        };
        let valid = at == name.len() || suffix.chars().next().is_some_and(char::is_lowercase);
        if let Some((owner, parent)) = ids.get(prefix).filter(|_| return valid) {
            return Some((*owner, parent.as_str(), suffix));
        }
        split = name.get(..at).and_then(|head| return head.rfind('_'));
    }
    return None;
}

/// Example name prefixes that select an entity: `""` for the package,
/// `F`, `T`, and `T_M` for methods. Each maps to the owner and its
/// display name.
fn example_owners(doc: &DocPackage) -> HashMap<String, (ExampleOwner, String)> {
    let mut ids = HashMap::new();
    ids.insert(String::new(), (ExampleOwner::Package, "package".to_owned()));
    for (i, function) in doc.functions.iter().enumerate() {
        ids.insert(function.name.clone(), (ExampleOwner::Function(i), function.name.clone()));
    }
    for (t, doc_type) in doc.types.iter().enumerate() {
        ids.insert(doc_type.name.clone(), (ExampleOwner::Type(t), doc_type.name.clone()));
        for (i, function) in doc_type.functions.iter().enumerate() {
            let owner = ExampleOwner::Constructor(t, i);
            ids.insert(function.name.clone(), (owner, function.name.clone()));
        }
        for (i, method) in doc_type.methods.iter().enumerate() {
            ids.insert(
                format!("{}_{}", doc_type.name, method.name),
                (ExampleOwner::Method(t, i), format!("{}.{}", doc_type.name, method.name)),
            );
        }
    }
    return ids;
}

/// First sentence of a doc comment, on one line.
///
/// The sentence ends at the first period followed by whitespace, or at the
/// end of the first paragraph.
pub fn synopsis(doc: &str) -> String {
    let paragraph = doc
        .trim_start()
        .split("\n\n")
        .next()
        .unwrap_or("");
    let words: Vec<&str> = paragraph.split_whitespace().collect();

    let mut sentence = Vec::new();
    for word in words {
        sentence.push(word);
        if word.ends_with('.') && !is_abbreviation(word) {
            break;
        }
    }
    return sentence.join(" ");
}

/// Whether a period-terminated word should not end a sentence.
fn is_abbreviation(word: &str) -> bool {
    const ABBREVIATIONS: [&str; 4] = ["e.g.", "i.e.", "etc.", "vs."];
    let lower = word.to_lowercase();
    return ABBREVIATIONS.iter().any(|a| return lower.ends_with(a)) || word.ends_with("..");
}

/// Whether a Go identifier is exported.
fn is_exported(name: &str) -> bool {
    return name.chars().next().is_some_and(char::is_uppercase);
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::code::Span;
    use crate::link::DocLink;

    struct FragmentResolver;

    impl LinkResolver for FragmentResolver {
        fn doc_link_url(&self, _from: &str, link: &DocLink) -> String {
            format!("{}#{}", link.import_path, link.name)
        }

        fn package_url(&self, _from: &str, target: &str) -> String {
            target.to_owned()
        }
    }

    fn exported_names(doc: &DocPackage) -> HashSet<String> {
        let mut names = HashSet::new();
        names.extend(doc.functions.iter().map(|f| f.name.clone()));
        for t in &doc.types {
            names.insert(t.name.clone());
            names.extend(t.functions.iter().map(|f| f.name.clone()));
            names.extend(t.methods.iter().map(|m| format!("{}.{}", t.name, m.name)));
            for v in t.constants.iter().chain(&t.variables) {
                names.extend(v.names.iter().cloned());
            }
        }
        for v in doc.constants.iter().chain(&doc.variables) {
            names.extend(v.names.iter().cloned());
        }
        names
    }

    const SOURCE: &str = r#"// Package shapes draws shapes.
package shapes

import "io"

// Kind of shape.
type Kind int

// Known kinds.
const (
	Circle Kind = iota
	Square
)

// MaxSides bounds polygons.
const MaxSides = 12

const internalLimit = 3

// Shape is drawable.
type Shape struct {
	Kind Kind
}

type canvas struct{}

// NewShape makes a shape.
func NewShape(k Kind) *Shape { return &Shape{Kind: k} }

// Draw writes the shape.
func (s *Shape) Draw(w io.Writer) error { return nil }

func (s *Shape) reset() {}

func (c canvas) Paint() {}

// Area computes an area.
func Area(s Shape) float64 { return 0 }

func helper() {}
"#;

    fn assemble(source: &str) -> DocPackage {
        assemble_with_tests(source, None)
    }

    fn assemble_with_tests(source: &str, tests: Option<&str>) -> DocPackage {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("shapes.go");
        std::fs::write(&file, source).unwrap();
        let mut test_files = Vec::new();
        if let Some(tests) = tests {
            let test_file = dir.path().join("shapes_example_test.go");
            std::fs::write(&test_file, tests).unwrap();
            test_files.push(test_file);
        }
        let package = crate::source::parse_package(&crate::types::PackageRef {
            files: vec![file],
            import_path: "example.com/shapes".to_owned(),
            module: None,
            name: "shapes".to_owned(),
            test_files,
        })
        .unwrap();
        Assembler::new(&FragmentResolver, Strictness::Diagnostic).assemble(&package)
    }

    #[test]
    fn groups_declarations_under_types() {
        let doc = assemble(SOURCE);
        assert_eq!(doc.name, "shapes");
        assert_eq!(doc.synopsis, "Package shapes draws shapes.");

        let types: Vec<&str> = doc.types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(types, ["Kind", "Shape"]);

        let kind = &doc.types[0];
        assert_eq!(kind.doc, "Kind of shape.");
        assert_eq!(kind.constants.len(), 1);
        assert_eq!(kind.constants[0].names, ["Circle", "Square"]);

        let shape = &doc.types[1];
        let ctors: Vec<&str> = shape.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(ctors, ["NewShape"]);
        let methods: Vec<&str> = shape.methods.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(methods, ["Draw"]);
        assert_eq!(shape.methods[0].recv.as_deref(), Some("Shape"));

        let functions: Vec<&str> = doc.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(functions, ["Area"]);
        assert_eq!(doc.constants.len(), 1);
        assert_eq!(doc.constants[0].names, ["MaxSides"]);
        assert!(doc.variables.is_empty());
    }

    #[test]
    fn hides_unexported_names() {
        let names = exported_names(&assemble(SOURCE));
        for hidden in ["internalLimit", "canvas", "helper", "Shape.reset", "Paint"] {
            assert!(!names.contains(hidden), "{hidden} leaked");
        }
    }

    #[test]
    fn declarations_are_linked() {
        let doc = assemble(SOURCE);
        let draw = &doc.types[1].methods[0];
        assert_eq!(draw.decl.plain(), "func (s *Shape) Draw(w io.Writer) error");
        let links: Vec<(&str, &str)> = draw
            .decl
            .spans
            .iter()
            .filter_map(|s| match s {
                Span::Link { dest, text } => Some((text.as_str(), dest.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(
            links,
            [("Shape", "#Shape"), ("io", "io"), ("Writer", "io#Writer"), ("error", "builtin#error")]
        );
    }

    #[test]
    fn struct_fields_are_anchored() {
        let doc = assemble(SOURCE);
        let anchors: Vec<&str> = doc.types[1]
            .decl
            .spans
            .iter()
            .filter_map(|s| match s {
                Span::Anchor { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(anchors, ["Shape.Kind"]);
    }

    const EXAMPLES: &str = r#"package shapes_test

import "example.com/shapes"

func Example() {
	// Output: hi
}

func ExampleArea() {
	shapes.Area(shapes.Shape{})
}

func ExampleShape() {}

func ExampleShape_reset() {}

func ExampleNewShape_square() {}

func ExampleShape_Draw_twice() {}

func ExampleShape_Draw() {}

func ExampleMissing() {}

func ExampleArea_Upper() {}
"#;

    fn example_ids(examples: &[DocExample]) -> Vec<&str> {
        examples.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn examples_attach_by_name() {
        let doc = assemble_with_tests(SOURCE, Some(EXAMPLES));
        assert_eq!(example_ids(&doc.examples), ["example-package"]);
        assert_eq!(doc.examples[0].output, "hi");
        assert_eq!(doc.examples[0].parent, "package");

        assert_eq!(example_ids(&doc.functions[0].examples), ["example-Area"]);
        assert_eq!(
            doc.functions[0].examples[0].code.plain(),
            "shapes.Area(shapes.Shape{})"
        );
        assert!(doc.functions[0].examples[0].output.is_empty());

        let shape = &doc.types[1];
        assert_eq!(example_ids(&shape.examples), ["example-Shape", "example-Shape-Reset"]);
        assert_eq!(shape.examples[1].suffix, "Reset");
        assert_eq!(example_ids(&shape.functions[0].examples), ["example-NewShape-Square"]);
        assert_eq!(
            example_ids(&shape.methods[0].examples),
            ["example-Shape.Draw", "example-Shape.Draw-Twice"]
        );
        assert!(doc.types[0].examples.is_empty());
    }

    #[test]
    fn unmatched_examples_are_dropped() {
        let doc = assemble_with_tests(SOURCE, Some(EXAMPLES));
        let mut all = doc.examples.clone();
        all.extend(doc.functions.iter().flat_map(|f| f.examples.clone()));
        for t in &doc.types {
            all.extend(t.examples.clone());
            all.extend(t.functions.iter().chain(&t.methods).flat_map(|f| f.examples.clone()));
        }
        assert_eq!(all.len(), 7);
        assert!(all.iter().all(|e| !e.id.contains("Missing") && !e.id.contains("Upper")));
    }

    #[test]
    fn synopsis_is_first_sentence() {
        let cases = [
            ("", ""),
            ("Package foo does things.", "Package foo does things."),
            ("Package foo does things. And more.", "Package foo does things."),
            ("Package foo\ndoes things.\nMore.", "Package foo does things."),
            ("Package foo has no period\n\nSecond paragraph.", "Package foo has no period"),
            ("Package foo parses e.g. JSON. Fast.", "Package foo parses e.g. JSON."),
            ("Version 1.2 is here. Yes.", "Version 1.2 is here."),
        ];
        for (doc, want) in cases {
            assert_eq!(synopsis(doc), want, "{doc:?}");
        }
    }

    #[test]
    fn missing_file_index_uses_no_imports() {
        let package = Package {
            decls: vec![Decl {
                doc: String::new(),
                file: 7,
                kind: DeclKind::Type { name: "T".to_owned() },
                text: "type T io.Reader".to_owned(),
            }],
            doc: String::new(),
            examples: Vec::new(),
            import_path: "p".to_owned(),
            imports: Vec::new(),
            name: "p".to_owned(),
            top_level: ["T".to_owned()].into(),
        };
        let doc = Assembler::new(&FragmentResolver, Strictness::Lenient).assemble(&package);
        assert_eq!(doc.types[0].decl.plain(), "type T io.Reader");
    }
}
