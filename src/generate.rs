//! Site generation: arrange packages into a tree by import path and write
//! one page per node, children first.

use std::cell::Cell;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::annotate::Strictness;
use crate::assemble::Assembler;
use crate::error::Error;
use crate::link::{DocLinker, RelLinkStyle};
use crate::pathtree::{PathTree, Snapshot};
use crate::relative;
use crate::render::{Breadcrumb, IndexPage, PackagePage, Renderer, Subpackage};
use crate::source;
use crate::types::PackageRef;

/// A node in the package tree: a package if it has a value, else a directory.
type PackageTree<'a> = Snapshot<'a, PackageRef>;

/// Settings for a [`Generator`].
#[derive(Debug, Clone)]
pub struct Options {
    /// Page file name within each output directory.
    pub basename: String,
    /// Import path that maps to the output root. Empty for none.
    pub home: String,
    /// Whether listings include internal packages.
    pub internal: bool,
    /// Output directory.
    pub out: PathBuf,
    /// How strictly declaration annotation is checked.
    pub strictness: Strictness,
    /// Shape of relative links.
    pub style: RelLinkStyle,
}

/// A package page that was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPackage {
    /// Import path of the package.
    pub import_path: String,
    /// First sentence of its documentation.
    pub synopsis: String,
}

/// Writes the documentation site.
pub struct Generator<'a> {
    /// Page file name within each output directory.
    basename: String,
    /// Import path that maps to the output root.
    home: String,
    /// Link destinations across packages.
    linker: &'a DocLinker,
    /// Output directory.
    out: PathBuf,
    /// HTML renderer.
    renderer: Renderer,
    /// Annotation strictness.
    strictness: Strictness,
    /// Package pages written so far.
    written: Cell<usize>,
}

impl<'a> Generator<'a> {
    /// Render every package in `refs` and the directories between them.
    ///
    /// Returns the topmost packages that were written, the ones the root
    /// page lists.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if an output directory or page cannot be written.
    /// Packages that fail to parse are logged and skipped.
    pub fn generate(&self, refs: &[PackageRef]) -> Result<Vec<RenderedPackage>, Error> {
        let mut tree = PathTree::new();
        for package in refs {
            if !relative::descends(&self.home, &package.import_path) {
                tracing::info!(
                    import_path = %package.import_path,
                    home = %self.home,
                    "Skipping package outside home"
                );
                continue;
            }
            tree.set(&package.import_path, package.clone());
        }

        let trees = filter_trees(&self.home, build_trees(&tree));
        return self.render_trees(&[], &trees);
    }

    /// Create a generator that resolves links with `linker`.
    pub fn new(options: Options, linker: &'a DocLinker) -> Self {
        return Self {
            renderer: Renderer::new(options.style, &options.basename, options.internal),
            basename: options.basename,
            home: options.home,
            linker,
            out: options.out,
            strictness: options.strictness,
            written: Cell::new(0),
        };
    }

    /// Number of package pages written by [`Generator::generate`].
    pub fn packages_written(&self) -> usize {
        return self.written.get();
    }

    /// Render a directory page after its children.
    fn render_index(
        &self,
        crumbs: &[Breadcrumb],
        tree: &PackageTree<'_>,
    ) -> Result<Vec<RenderedPackage>, Error> {
        let rendered = self.render_trees(crumbs, &tree.children)?;
        tracing::debug!(path = %tree.path, "Rendering directory");

        let subpackages = subpackages(&tree.path, &rendered);
        let html = self.renderer.render_index(&IndexPage {
            breadcrumbs: crumbs,
            path: &tree.path,
            subpackages: &subpackages,
        });
        self.write_page(&tree.path, &html)?;
        return Ok(rendered);
    }

    /// Render a package page after its children. A package that cannot be
    /// parsed is skipped, leaving only its descendants.
    fn render_package(
        &self,
        crumbs: &[Breadcrumb],
        tree: &PackageTree<'_>,
        package: &PackageRef,
    ) -> Result<Vec<RenderedPackage>, Error> {
        let rendered = self.render_trees(crumbs, &tree.children)?;
        tracing::debug!(path = %tree.path, "Rendering package");

        let parsed = match source::parse_package(package) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(import_path = %package.import_path, error = %e, "Skipping package");
                return Ok(rendered);
            },
        };
        let doc = Assembler::new(self.linker, self.strictness).assemble(&parsed);

        let subpackages = subpackages(&doc.import_path, &rendered);
        let html = self.renderer.render_package(&PackagePage {
            breadcrumbs: crumbs,
            package: &doc,
            subpackages: &subpackages,
        });
        self.write_page(&tree.path, &html)?;
        self.written.set(self.written.get().saturating_add(1));

        return Ok(vec![RenderedPackage {
            import_path: package.import_path.clone(),
            synopsis: doc.synopsis,
        }]);
    }

    /// Render one node and its subtree.
    fn render_tree(
        &self,
        crumbs: &[Breadcrumb],
        tree: &PackageTree<'_>,
    ) -> Result<Vec<RenderedPackage>, Error> {
        let text = crumbs.last().map_or_else(
            || return tree.path.clone(),
            |c| return relative::path(&c.path, &tree.path),
        );
        let mut crumbs = crumbs.to_vec();
        if !text.is_empty() {
            crumbs.push(Breadcrumb {
                path: tree.path.clone(),
                text,
            });
        }

        return match tree.value {
            Some(package) => self.render_package(&crumbs, tree, package),
            None => self.render_index(&crumbs, tree),
        };
    }

    /// Render sibling subtrees, concatenating what they wrote.
    fn render_trees(
        &self,
        crumbs: &[Breadcrumb],
        trees: &[PackageTree<'_>],
    ) -> Result<Vec<RenderedPackage>, Error> {
        let mut rendered = Vec::new();
        for tree in trees {
            rendered.extend(self.render_tree(crumbs, tree)?);
        }
        return Ok(rendered);
    }

    /// Write a page for the node at `path`, replacing any existing file.
    fn write_page(&self, path: &str, html: &str) -> Result<(), Error> {
        let dir = output_dir(&self.out, &relative::path(&self.home, path));
        std::fs::create_dir_all(&dir)?;

        let file = std::fs::File::create(dir.join(&self.basename))?;
        let mut writer = std::io::BufWriter::new(file);
        writer.write_all(html.as_bytes())?;
        writer.flush()?;
        return Ok(());
    }
}

/// The package tree under a directory node at the empty path.
pub fn build_trees(tree: &PathTree<PackageRef>) -> Vec<PackageTree<'_>> {
    return vec![Snapshot {
        children: tree.snapshot(),
        path: String::new(),
        value: None,
    }];
}

/// The topmost subtrees at or below `root`.
pub fn filter_trees<'a>(root: &str, trees: Vec<PackageTree<'a>>) -> Vec<PackageTree<'a>> {
    let mut kept = Vec::new();
    for tree in trees {
        if relative::descends(root, &tree.path) {
            kept.push(tree);
        } else {
            kept.extend(filter_trees(root, tree.children));
        }
    }
    return kept;
}

/// `out` joined with a `/`-separated relative path.
fn output_dir(out: &Path, relative: &str) -> PathBuf {
    let mut dir = out.to_path_buf();
    for segment in relative.split('/').filter(|s| return !s.is_empty()) {
        dir.push(segment);
    }
    return dir;
}

/// Listing entries for packages rendered under `from`.
fn subpackages(from: &str, rendered: &[RenderedPackage]) -> Vec<Subpackage> {
    return rendered
        .iter()
        .map(|r| {
            return Subpackage {
                relative_path: relative::path(from, &r.import_path),
                synopsis: r.synopsis.clone(),
            };
        })
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(dir: &Path, import_path: &str, source: &str) -> PackageRef {
        let pkg_dir = dir.join("src").join(import_path);
        std::fs::create_dir_all(&pkg_dir).unwrap();
        let file = pkg_dir.join("p.go");
        std::fs::write(&file, source).unwrap();
        PackageRef {
            files: vec![file],
            import_path: import_path.to_owned(),
            module: None,
            name: import_path.rsplit('/').next().unwrap().to_owned(),
            test_files: Vec::new(),
        }
    }

    fn options(out: &Path) -> Options {
        Options {
            basename: "index.html".to_owned(),
            home: String::new(),
            internal: false,
            out: out.to_path_buf(),
            strictness: Strictness::Diagnostic,
            style: RelLinkStyle::Plain,
        }
    }

    fn paths(trees: &[PackageTree<'_>]) -> Vec<String> {
        let mut out = Vec::new();
        for tree in trees {
            out.push(tree.path.clone());
            out.extend(paths(&tree.children));
        }
        out
    }

    #[test]
    fn tree_is_rooted_at_empty_path() {
        let mut tree = PathTree::new();
        for path in ["a/b/c", "a/d"] {
            tree.set(
                path,
                PackageRef {
                    files: Vec::new(),
                    import_path: path.to_owned(),
                    module: None,
                    name: String::new(),
                    test_files: Vec::new(),
                },
            );
        }
        let trees = build_trees(&tree);
        assert_eq!(trees.len(), 1);
        assert!(trees[0].value.is_none());
        assert_eq!(paths(&trees), ["", "a", "a/b/c", "a/d"]);

        let filtered = filter_trees("a/b", build_trees(&tree));
        assert_eq!(paths(&filtered), ["a/b/c"]);
        let filtered = filter_trees("a", build_trees(&tree));
        assert_eq!(paths(&filtered), ["a", "a/b/c", "a/d"]);
    }

    #[test]
    fn renders_leaves_and_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let refs = vec![
            package(dir.path(), "a/b/c", "// Package c is deep.\npackage c\n"),
            package(dir.path(), "a/d", "// Package d is shallow.\npackage d\n"),
        ];
        let linker = DocLinker::new(RelLinkStyle::Plain, "index.html");

        let generator = Generator::new(options(&out), &linker);
        let rendered = generator.generate(&refs).unwrap();
        assert_eq!(generator.packages_written(), 2);
        assert_eq!(
            rendered,
            vec![
                RenderedPackage {
                    import_path: "a/b/c".to_owned(),
                    synopsis: "Package c is deep.".to_owned(),
                },
                RenderedPackage {
                    import_path: "a/d".to_owned(),
                    synopsis: "Package d is shallow.".to_owned(),
                },
            ]
        );

        let root = std::fs::read_to_string(out.join("index.html")).unwrap();
        assert!(root.contains("<a href=\"a/b/c\">a/b/c</a>"));
        assert!(root.contains("<a href=\"a/d\">a/d</a>"));

        let a = std::fs::read_to_string(out.join("a/index.html")).unwrap();
        assert!(a.contains("<a href=\"b/c\">b/c</a>"));
        assert!(a.contains("<a href=\"d\">d</a>"));
        assert!(a.contains("<span>a</span>"));

        assert!(!out.join("a/b/index.html").exists());

        let c = std::fs::read_to_string(out.join("a/b/c/index.html")).unwrap();
        assert!(c.contains("<h1>package c</h1>"));
        assert!(c.contains("<a href=\"../..\">a</a><span>b/c</span>"));
    }

    #[test]
    fn unparseable_package_keeps_descendants() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let refs = vec![
            package(dir.path(), "x", "this is not go\n"),
            package(dir.path(), "x/y", "package y\n"),
        ];
        let linker = DocLinker::new(RelLinkStyle::Plain, "index.html");

        let rendered = Generator::new(options(&out), &linker).generate(&refs).unwrap();
        let paths: Vec<&str> = rendered.iter().map(|r| r.import_path.as_str()).collect();
        assert_eq!(paths, ["x/y"]);
        assert!(!out.join("x/index.html").exists());
        assert!(out.join("x/y/index.html").exists());

        let root = std::fs::read_to_string(out.join("index.html")).unwrap();
        assert!(root.contains("x/y"));
    }

    #[test]
    fn home_reroots_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let refs = vec![
            package(dir.path(), "example.com/proj", "package proj\n"),
            package(dir.path(), "example.com/proj/sub", "package sub\n"),
            package(dir.path(), "example.com/other", "package other\n"),
        ];
        let linker = DocLinker::new(RelLinkStyle::Plain, "index.html");
        let options = Options {
            home: "example.com/proj".to_owned(),
            ..options(&out)
        };

        let generator = Generator::new(options, &linker);
        let rendered = generator.generate(&refs).unwrap();
        let paths: Vec<&str> = rendered.iter().map(|r| r.import_path.as_str()).collect();
        assert_eq!(paths, ["example.com/proj"]);
        assert_eq!(generator.packages_written(), 2);

        let home = std::fs::read_to_string(out.join("index.html")).unwrap();
        assert!(home.contains("<h1>package proj</h1>"));
        assert!(home.contains("<a href=\"sub\">sub</a>"));
        assert!(out.join("sub/index.html").exists());
        assert!(!out.join("example.com").exists());
    }

    #[test]
    fn custom_basename() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let refs = vec![package(dir.path(), "p", "package p\n")];
        let linker = DocLinker::new(RelLinkStyle::Plain, "README.html");
        let options = Options {
            basename: "README.html".to_owned(),
            ..options(&out)
        };

        Generator::new(options, &linker).generate(&refs).unwrap();
        assert!(out.join("README.html").exists());
        assert!(out.join("p/README.html").exists());
        assert!(!out.join("index.html").exists());
    }
}
