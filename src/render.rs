//! HTML pages for packages and package directories.

use std::fmt::Write;

use crate::assemble::{DocExample, DocFunction, DocPackage, DocType, DocValue};
use crate::code::{Code, Span};
use crate::link::RelLinkStyle;
use crate::relative;

/// Inline stylesheet shared by every page.
const STYLE: &str = "body{font-family:sans-serif;max-width:60rem;margin:0 auto;padding:1rem 2rem}\
pre{background:#f6f8fa;padding:0.75rem;overflow-x:auto}\
a{color:#0b6bcb;text-decoration:none}\
nav.breadcrumbs a::after{content:\"/\";margin:0 0.4rem;color:#999}\
.comment{color:#6a737d}\
.error{color:#b31d28;font-weight:bold}\
details.example{margin:0.5rem 0}\
details.example summary{cursor:pointer;color:#555}\
table.subpackages td{padding:0.2rem 1rem 0.2rem 0}";

/// One step of the breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    /// Path of the crumb from the root of the output.
    pub path: String,
    /// Displayed text.
    pub text: String,
}

/// A package listed under another page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subpackage {
    /// Path relative to the page listing it.
    pub relative_path: String,
    /// First sentence of its documentation.
    pub synopsis: String,
}

/// A directory page that lists packages but documents none.
pub struct IndexPage<'a> {
    /// Trail from the site root.
    pub breadcrumbs: &'a [Breadcrumb],
    /// Path of the directory.
    pub path: &'a str,
    /// Packages below the directory.
    pub subpackages: &'a [Subpackage],
}

/// A package documentation page.
pub struct PackagePage<'a> {
    /// Trail from the site root.
    pub breadcrumbs: &'a [Breadcrumb],
    /// Documentation to render.
    pub package: &'a DocPackage,
    /// Packages below this one.
    pub subpackages: &'a [Subpackage],
}

/// Writes complete HTML documents.
#[derive(Debug, Clone)]
pub struct Renderer {
    /// Page file name, for relative links to other pages.
    basename: String,
    /// Whether listings include internal packages.
    internal: bool,
    /// Shape of relative links.
    style: RelLinkStyle,
}

impl Renderer {
    /// Trail of links back to the site root.
    fn breadcrumbs(&self, html: &mut String, from: &str, crumbs: &[Breadcrumb]) {
        if crumbs.is_empty() {
            return;
        }
        html.push_str("<nav class=\"breadcrumbs\">");
        let last = crumbs.len().saturating_sub(1);
        for (i, crumb) in crumbs.iter().enumerate() {
            if i == last {
                let _ = write!(html, "<span>{}</span>", escape(&crumb.text));
            } else {
                let _ = write!(
                    html,
                    "<a href=\"{}\">{}</a>",
                    escape(&self.href(from, &crumb.path)),
                    escape(&crumb.text)
                );
            }
        }
        html.push_str("</nav>\n");
    }

    /// Link from the page at `from` to the page at `to`.
    fn href(&self, from: &str, to: &str) -> String {
        return self.style.normalize(&relative::path(from, to), &self.basename);
    }

    /// Create a renderer.
    pub fn new(style: RelLinkStyle, basename: &str, internal: bool) -> Self {
        return Self {
            basename: basename.to_owned(),
            internal,
            style,
        };
    }

    /// Render a directory page.
    pub fn render_index(&self, page: &IndexPage<'_>) -> String {
        let mut html = String::with_capacity(2048);
        let title = if page.path.is_empty() { "Packages" } else { page.path };
        open_document(&mut html, title);
        self.breadcrumbs(&mut html, page.path, page.breadcrumbs);

        let _ = writeln!(html, "<h1>{}</h1>", escape(title));
        self.subpackages(&mut html, page.path, page.subpackages);
        close_document(&mut html);
        return html;
    }

    /// Render a package page.
    pub fn render_package(&self, page: &PackagePage<'_>) -> String {
        let package = page.package;
        let from = package.import_path.as_str();
        let mut html = String::with_capacity(8192);
        open_document(&mut html, &format!("{} package - {}", package.name, package.import_path));
        self.breadcrumbs(&mut html, from, page.breadcrumbs);

        let _ = writeln!(html, "<h1>package {}</h1>", escape(&package.name));
        let _ = writeln!(
            html,
            "<pre><code>import \"{}\"</code></pre>",
            escape(&package.import_path)
        );

        if !package.doc.is_empty() || !package.examples.is_empty() {
            html.push_str("<h2 id=\"pkg-overview\">Overview</h2>\n");
            render_doc(&mut html, &package.doc);
            render_examples(&mut html, &package.examples);
        }

        render_index(&mut html, package);

        if !package.constants.is_empty() {
            html.push_str("<h2 id=\"pkg-constants\">Constants</h2>\n");
            render_values(&mut html, &package.constants);
        }
        if !package.variables.is_empty() {
            html.push_str("<h2 id=\"pkg-variables\">Variables</h2>\n");
            render_values(&mut html, &package.variables);
        }
        if !package.functions.is_empty() {
            html.push_str("<h2 id=\"pkg-functions\">Functions</h2>\n");
            for function in &package.functions {
                render_function(&mut html, function);
            }
        }
        if !package.types.is_empty() {
            html.push_str("<h2 id=\"pkg-types\">Types</h2>\n");
            for doc_type in &package.types {
                render_type(&mut html, doc_type);
            }
        }

        self.subpackages(&mut html, from, page.subpackages);
        close_document(&mut html);
        return html;
    }

    /// Table of packages below the page at `from`. Internal packages are
    /// left out unless the renderer was asked to include them.
    fn subpackages(&self, html: &mut String, from: &str, subpackages: &[Subpackage]) {
        let shown: Vec<&Subpackage> = subpackages
            .iter()
            .filter(|s| return self.internal || !is_internal(&s.relative_path))
            .collect();
        if shown.is_empty() {
            return;
        }

        html.push_str("<h2 id=\"pkg-subdirectories\">Directories</h2>\n");
        html.push_str("<table class=\"subpackages\">\n");
        for sub in shown {
            let target = join(from, &sub.relative_path);
            let _ = writeln!(
                html,
                "<tr><td><a href=\"{}\">{}</a></td><td>{}</td></tr>",
                escape(&self.href(from, &target)),
                escape(&sub.relative_path),
                escape(&sub.synopsis)
            );
        }
        html.push_str("</table>\n");
    }
}

/// Whether a relative package path names an internal package.
pub fn is_internal(relative_path: &str) -> bool {
    return relative_path == "internal"
        || relative_path.starts_with("internal/")
        || relative_path.ends_with("/internal")
        || relative_path.contains("/internal/");
}

/// Escape text for HTML content and attribute values.
pub fn escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    return result;
}

/// Render a code block.
pub fn render_code(html: &mut String, code: &Code) {
    html.push_str("<pre><code>");
    for span in &code.spans {
        match span {
            Span::Anchor { id, text } => {
                let _ = write!(html, "<span id=\"{}\">{}</span>", escape(id), escape(text));
            },
            Span::Comment(text) => {
                let _ = write!(html, "<span class=\"comment\">{}</span>", escape(text));
            },
            Span::Error { cause, message } => {
                let _ = write!(
                    html,
                    "<span class=\"error\">{}: {}</span>",
                    escape(message),
                    escape(cause)
                );
            },
            Span::Link { dest, text } => {
                let _ = write!(html, "<a href=\"{}\">{}</a>", escape(dest), escape(text));
            },
            Span::Text(text) => html.push_str(&escape(text)),
        }
    }
    html.push_str("</code></pre>\n");
}

/// Render a doc comment: paragraphs, indented blocks as preformatted text,
/// and `# Heading` lines as headings.
pub fn render_doc(html: &mut String, doc: &str) {
    let mut paragraph: Vec<&str> = Vec::new();
    let mut preformatted: Vec<&str> = Vec::new();

    for line in doc.lines() {
        if line.starts_with([' ', '\t']) && !line.trim().is_empty() {
            flush_paragraph(html, &mut paragraph);
            preformatted.push(line);
            continue;
        }
        if line.trim().is_empty() && !preformatted.is_empty() {
            preformatted.push("");
            continue;
        }
        flush_preformatted(html, &mut preformatted);

        if let Some(heading) = line.strip_prefix("# ") {
            flush_paragraph(html, &mut paragraph);
            let _ = writeln!(html, "<h3>{}</h3>", escape(heading.trim()));
        } else if line.trim().is_empty() {
            flush_paragraph(html, &mut paragraph);
        } else {
            paragraph.push(line.trim());
        }
    }
    flush_paragraph(html, &mut paragraph);
    flush_preformatted(html, &mut preformatted);
}

// ── Page sections ──

/// Links to every documented item.
fn render_index(html: &mut String, package: &DocPackage) {
    let has_items = !package.constants.is_empty()
        || !package.variables.is_empty()
        || !package.functions.is_empty()
        || !package.types.is_empty()
        || !package.examples.is_empty();
    if !has_items {
        return;
    }

    html.push_str("<h2 id=\"pkg-index\">Index</h2>\n<ul class=\"index\">\n");
    if !package.constants.is_empty() {
        html.push_str("<li><a href=\"#pkg-constants\">Constants</a></li>\n");
    }
    if !package.variables.is_empty() {
        html.push_str("<li><a href=\"#pkg-variables\">Variables</a></li>\n");
    }
    for function in &package.functions {
        index_entry(html, &function.name, &function.decl);
    }
    for doc_type in &package.types {
        let _ = writeln!(
            html,
            "<li><a href=\"#{id}\">type {id}</a></li>",
            id = escape(&doc_type.name)
        );
        if doc_type.functions.is_empty() && doc_type.methods.is_empty() {
            continue;
        }
        html.push_str("<ul>\n");
        for function in &doc_type.functions {
            index_entry(html, &function.name, &function.decl);
        }
        for method in &doc_type.methods {
            index_entry(html, &format!("{}.{}", doc_type.name, method.name), &method.decl);
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</ul>\n");

    let examples = all_examples(package);
    if examples.is_empty() {
        return;
    }
    html.push_str("<h3 id=\"pkg-examples\">Examples</h3>\n<ul class=\"examples\">\n");
    for example in examples {
        let label = if example.suffix.is_empty() {
            example.parent.clone()
        } else {
            format!("{} ({})", example.parent, example.suffix)
        };
        let _ = writeln!(
            html,
            "<li><a href=\"#{}\">{}</a></li>",
            escape(&example.id),
            escape(&label)
        );
    }
    html.push_str("</ul>\n");
}

/// Every example in the package, in page order.
fn all_examples(package: &DocPackage) -> Vec<&DocExample> {
    let mut examples: Vec<&DocExample> = package.examples.iter().collect();
    for function in &package.functions {
        examples.extend(&function.examples);
    }
    for doc_type in &package.types {
        examples.extend(&doc_type.examples);
        for function in doc_type.functions.iter().chain(&doc_type.methods) {
            examples.extend(&function.examples);
        }
    }
    return examples;
}

/// One function or method in the index, showing its signature.
fn index_entry(html: &mut String, id: &str, decl: &Code) {
    let _ = writeln!(
        html,
        "<li><a href=\"#{}\">{}</a></li>",
        escape(id),
        escape(&decl.plain())
    );
}

/// A group of constants or variables.
fn render_values(html: &mut String, values: &[DocValue]) {
    for value in values {
        render_code(html, &value.decl);
        render_doc(html, &value.doc);
    }
}

/// A function or method with its heading.
fn render_function(html: &mut String, function: &DocFunction) {
    let (id, heading) = match &function.recv {
        Some(recv) => (
            format!("{recv}.{}", function.name),
            format!("func ({recv}) {}", function.name),
        ),
        None => (function.name.clone(), format!("func {}", function.name)),
    };
    let _ = writeln!(html, "<h3 id=\"{}\">{}</h3>", escape(&id), escape(&heading));
    render_code(html, &function.decl);
    render_doc(html, &function.doc);
    render_examples(html, &function.examples);
}

/// Collapsible examples, each with its code and expected output.
fn render_examples(html: &mut String, examples: &[DocExample]) {
    for example in examples {
        let _ = writeln!(html, "<details class=\"example\" id=\"{}\">", escape(&example.id));
        if example.suffix.is_empty() {
            html.push_str("<summary>Example</summary>\n");
        } else {
            let _ = writeln!(html, "<summary>Example ({})</summary>", escape(&example.suffix));
        }
        render_doc(html, &example.doc);
        html.push_str("<p>Code:</p>\n");
        render_code(html, &example.code);
        if !example.output.is_empty() {
            let _ = writeln!(html, "<p>Output:</p>\n<pre>{}</pre>", escape(&example.output));
        }
        html.push_str("</details>\n");
    }
}

/// A type with everything grouped under it.
fn render_type(html: &mut String, doc_type: &DocType) {
    let _ = writeln!(
        html,
        "<h3 id=\"{id}\">type {id}</h3>",
        id = escape(&doc_type.name)
    );
    render_code(html, &doc_type.decl);
    render_doc(html, &doc_type.doc);
    render_examples(html, &doc_type.examples);
    render_values(html, &doc_type.constants);
    render_values(html, &doc_type.variables);
    for function in doc_type.functions.iter().chain(&doc_type.methods) {
        render_function(html, function);
    }
}

// ── Helpers ──

/// Document head through the opening of `<body>`.
fn open_document(html: &mut String, title: &str) {
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape(title));
    let _ = writeln!(html, "<style>{STYLE}</style>");
    html.push_str("</head>\n<body>\n<main>\n");
}

/// Close what [`open_document`] opened.
fn close_document(html: &mut String) {
    html.push_str("</main>\n</body>\n</html>\n");
}

/// Emit and clear a pending paragraph.
fn flush_paragraph(html: &mut String, lines: &mut Vec<&str>) {
    if lines.is_empty() {
        return;
    }
    let _ = writeln!(html, "<p>{}</p>", escape(&lines.join(" ")));
    lines.clear();
}

/// Emit and clear a pending preformatted block.
fn flush_preformatted(html: &mut String, lines: &mut Vec<&str>) {
    while lines.last().is_some_and(|l| return l.is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        return;
    }
    let indent = lines
        .iter()
        .filter(|l| return !l.is_empty())
        .map(|l| return l.len().saturating_sub(l.trim_start().len()))
        .min()
        .unwrap_or(0);
    let body: Vec<&str> = lines.iter().map(|l| return l.get(indent..).unwrap_or("")).collect();
    let _ = writeln!(html, "<pre>{}</pre>", escape(&body.join("\n")));
    lines.clear();
}

/// `base/rest`, or `rest` when `base` is empty.
fn join(base: &str, rest: &str) -> String {
    if base.is_empty() {
        return rest.to_owned();
    }
    return format!("{base}/{rest}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Span {
        Span::Text(s.to_owned())
    }

    fn sample_package() -> DocPackage {
        DocPackage {
            doc: "Package foo does <things>.\n\nUsage:\n\n\tfoo.Run()\n\n# Details\n\nMore here."
                .to_owned(),
            functions: vec![DocFunction {
                decl: Code {
                    spans: vec![
                        text("func Run() "),
                        Span::Link {
                            dest: "../builtin#error".to_owned(),
                            text: "error".to_owned(),
                        },
                    ],
                },
                doc: "Run runs.".to_owned(),
                examples: vec![DocExample {
                    code: Code::highlight("// Start it.\nfoo.Run()"),
                    id: "example-Run-Twice".to_owned(),
                    output: "ran <1>".to_owned(),
                    parent: "Run".to_owned(),
                    suffix: "Twice".to_owned(),
                    ..DocExample::default()
                }],
                name: "Run".to_owned(),
                recv: None,
            }],
            import_path: "example.com/foo".to_owned(),
            name: "foo".to_owned(),
            synopsis: "Package foo does <things>.".to_owned(),
            types: vec![DocType {
                decl: Code {
                    spans: vec![
                        text("type Opts struct {\n\t"),
                        Span::Anchor {
                            id: "Opts.Name".to_owned(),
                            text: "Name".to_owned(),
                        },
                        text(" string\n}"),
                    ],
                },
                methods: vec![DocFunction {
                    decl: Code {
                        spans: vec![text("func (o Opts) Valid() bool")],
                    },
                    doc: String::new(),
                    examples: Vec::new(),
                    name: "Valid".to_owned(),
                    recv: Some("Opts".to_owned()),
                }],
                name: "Opts".to_owned(),
                ..DocType::default()
            }],
            ..DocPackage::default()
        }
    }

    fn subpackages() -> Vec<Subpackage> {
        vec![
            Subpackage {
                relative_path: "bar".to_owned(),
                synopsis: "Package bar.".to_owned(),
            },
            Subpackage {
                relative_path: "internal/baz".to_owned(),
                synopsis: "Package baz.".to_owned(),
            },
        ]
    }

    #[test]
    fn package_page_sections() {
        let package = sample_package();
        let subs = subpackages();
        let crumbs = vec![
            Breadcrumb {
                path: "example.com".to_owned(),
                text: "example.com".to_owned(),
            },
            Breadcrumb {
                path: "example.com/foo".to_owned(),
                text: "foo".to_owned(),
            },
        ];
        let renderer = Renderer::new(RelLinkStyle::Plain, "index.html", false);
        let html = renderer.render_package(&PackagePage {
            breadcrumbs: &crumbs,
            package: &package,
            subpackages: &subs,
        });

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>foo package - example.com/foo</title>"));
        assert!(html.contains("<h1>package foo</h1>"));
        assert!(html.contains("<p>Package foo does &lt;things&gt;.</p>"));
        assert!(html.contains("<pre>foo.Run()</pre>"));
        assert!(html.contains("<h3>Details</h3>"));
        assert!(html.contains("<h3 id=\"Run\">func Run</h3>"));
        assert!(html.contains("<a href=\"../builtin#error\">error</a>"));
        assert!(html.contains("<span id=\"Opts.Name\">Name</span>"));
        assert!(html.contains("<h3 id=\"Opts.Valid\">func (Opts) Valid</h3>"));
        assert!(html.contains("<a href=\"#Opts.Valid\">func (o Opts) Valid() bool</a>"));
        assert!(html.contains("<a href=\"..\">example.com</a><span>foo</span>"));
        assert!(html.contains("<a href=\"bar\">bar</a>"));
        assert!(!html.contains("internal/baz"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn examples_render_with_output() {
        let mut package = sample_package();
        package.examples.push(DocExample {
            code: Code::highlight("foo.Run()"),
            doc: "Basic use.".to_owned(),
            id: "example-package".to_owned(),
            parent: "package".to_owned(),
            ..DocExample::default()
        });
        let renderer = Renderer::new(RelLinkStyle::Plain, "index.html", false);
        let html = renderer.render_package(&PackagePage {
            breadcrumbs: &[],
            package: &package,
            subpackages: &[],
        });

        assert!(html.contains(
            "<details class=\"example\" id=\"example-package\">\n<summary>Example</summary>"
        ));
        assert!(html.contains("<p>Basic use.</p>"));
        assert!(html.contains("<summary>Example (Twice)</summary>"));
        assert!(html.contains("<span class=\"comment\">// Start it.</span>\nfoo.Run()"));
        assert!(html.contains("<p>Output:</p>\n<pre>ran &lt;1&gt;</pre>"));
        assert_eq!(html.matches("<p>Output:</p>").count(), 1);
        assert!(html.contains("<a href=\"#example-package\">package</a>"));
        assert!(html.contains("<a href=\"#example-Run-Twice\">Run (Twice)</a>"));

        let overview = html.find("id=\"pkg-overview\"").unwrap();
        let package_example = html.find("id=\"example-package\"").unwrap();
        let index = html.find("id=\"pkg-index\"").unwrap();
        assert!(overview < package_example && package_example < index);
    }

    #[test]
    fn internal_packages_listed_on_request() {
        let subs = subpackages();
        let renderer = Renderer::new(RelLinkStyle::Directory, "index.html", true);
        let html = renderer.render_index(&IndexPage {
            breadcrumbs: &[],
            path: "",
            subpackages: &subs,
        });
        assert!(html.contains("<h1>Packages</h1>"));
        assert!(html.contains("<a href=\"bar/\">bar</a>"));
        assert!(html.contains("<a href=\"internal/baz/\">internal/baz</a>"));
        assert!(!html.contains("<nav class=\"breadcrumbs\">"));
    }

    #[test]
    fn custom_basename_in_links() {
        let subs = subpackages();
        let renderer = Renderer::new(RelLinkStyle::Plain, "README.html", false);
        let html = renderer.render_index(&IndexPage {
            breadcrumbs: &[],
            path: "example.com",
            subpackages: &subs,
        });
        assert!(html.contains("<a href=\"bar/README.html\">bar</a>"));
    }

    #[test]
    fn error_spans_are_visible() {
        let mut html = String::new();
        render_code(
            &mut html,
            &Code {
                spans: vec![Span::Error {
                    cause: "bad <input>".to_owned(),
                    message: "Could not format declaration".to_owned(),
                }],
            },
        );
        assert_eq!(
            html,
            concat!(
                "<pre><code><span class=\"error\">",
                "Could not format declaration: bad &lt;input&gt;",
                "</span></code></pre>\n",
            )
        );
    }

    #[test]
    fn comments_are_muted() {
        let mut html = String::new();
        render_code(
            &mut html,
            &Code {
                spans: vec![text("A = 1 "), Span::Comment("// one".to_owned())],
            },
        );
        assert!(html.contains("A = 1 <span class=\"comment\">// one</span>"));
    }

    #[test]
    fn internal_paths() {
        for path in ["internal", "internal/x", "x/internal", "x/internal/y"] {
            assert!(is_internal(path), "{path}");
        }
        for path in ["internals", "x/internalz", "notinternal/x", "x"] {
            assert!(!is_internal(path), "{path}");
        }
    }

    #[test]
    fn doc_blocks() {
        let mut html = String::new();
        render_doc(&mut html, "First line\nsecond line.\n\n\tcode\n\t\tnested\n\nAfter.");
        assert_eq!(
            html,
            "<p>First line second line.</p>\n<pre>code\n\tnested</pre>\n<p>After.</p>\n"
        );
    }

    #[test]
    fn escape_special_characters() {
        assert_eq!(escape("<script>"), "&lt;script&gt;");
        assert_eq!(escape("a&b"), "a&amp;b");
        assert_eq!(escape("\"hello\""), "&quot;hello&quot;");
    }
}
