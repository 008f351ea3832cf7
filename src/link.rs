//! Link destinations for packages and the entities inside them.
//!
//! In order of preference a package link is:
//!
//! 1. relative, if the package is documented by this run;
//! 2. rendered from the URL template registered for it or an ancestor;
//! 3. a versioned pkg.go.dev URL, if the linking module pins a version;
//! 4. an unversioned pkg.go.dev URL.

use std::collections::HashSet;

use minijinja::{Environment, UndefinedBehavior, context};

use crate::error::Error;
use crate::gomod::{Module, ModuleTree};
use crate::pathtree::PathTree;
use crate::relative;

/// Where packages without a local page or a template are documented.
const DEFAULT_HOST: &str = "https://pkg.go.dev/";

/// Basename under which a directory's page is served implicitly.
const IMPLICIT_BASENAME: &str = "index.html";

/// Reference to a package or to something inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocLink {
    /// Package import path. Empty for the current package.
    pub import_path: String,
    /// Entity name. Empty to link the package itself.
    pub name: String,
    /// Receiver type, when `name` is a method or field.
    pub recv: Option<String>,
}

/// Shape of relative links between local pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum RelLinkStyle {
    /// `foo/` for servers that want the directory form.
    Directory,
    /// `foo`.
    #[default]
    Plain,
}

/// A package documentation URL template, in minijinja syntax.
///
/// Templates see `ImportPath` and `Module`. `Module` has `Path`, `Version`
/// and `Subpath`, and is `none` when the linking module does not pin the
/// target. Undefined values are errors, so `{{ Module.Version }}` without
/// module data fails instead of printing nothing.
#[derive(Debug, Clone)]
pub struct LinkTemplate {
    /// Template text, checked to compile.
    source: String,
}

/// Turns package references into URLs.
pub trait LinkResolver {
    /// URL for `link`, as seen from the page of package `from`.
    fn doc_link_url(&self, from: &str, link: &DocLink) -> String;

    /// URL of the documentation for package `target`, as seen from the
    /// page of package `from`.
    fn package_url(&self, from: &str, target: &str) -> String;
}

/// The link resolver used for a whole site.
#[derive(Debug, Default)]
pub struct DocLinker {
    /// Output page name, for relative links.
    basename: String,
    /// Packages with a page in this site.
    local: HashSet<String>,
    /// Dependency versions, when version-qualified links are enabled.
    modules: Option<ModuleTree>,
    /// Relative link shape.
    style: RelLinkStyle,
    /// URL templates keyed by import path prefix.
    templates: PathTree<LinkTemplate>,
}

/// Module part of the template context.
#[derive(serde::Serialize)]
#[serde(rename_all = "PascalCase")]
struct ModuleData<'a> {
    /// Module path.
    path: &'a str,
    /// Import path relative to the module root. Empty at the root.
    subpath: &'a str,
    /// Module version.
    version: &'a str,
}

impl RelLinkStyle {
    /// Shape a relative link to a package page.
    ///
    /// A non-default page basename is always spelled out, since servers
    /// only resolve `index.html` implicitly.
    pub fn normalize(self, path: &str, basename: &str) -> String {
        let path = path.strip_suffix('/').unwrap_or(path);
        if !basename.is_empty() && basename != IMPLICIT_BASENAME {
            if path.is_empty() {
                return basename.to_owned();
            }
            return format!("{path}/{basename}");
        }
        return match self {
            Self::Directory if path.is_empty() => "./".to_owned(),
            Self::Directory => format!("{path}/"),
            Self::Plain if path.is_empty() => ".".to_owned(),
            Self::Plain => path.to_owned(),
        };
    }
}

impl LinkTemplate {
    /// Compile template text registered for `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `Error::TemplateInvalid` if the text is not a valid template.
    pub fn parse(prefix: &str, source: &str) -> Result<Self, Error> {
        let env = environment();
        if let Err(e) = env.template_from_str(source) {
            return Err(Error::TemplateInvalid {
                path: prefix.to_owned(),
                reason: e.to_string(),
                template: source.to_owned(),
            });
        }
        return Ok(Self {
            source: source.to_owned(),
        });
    }

    /// Render for package `import_path`.
    ///
    /// # Errors
    ///
    /// Returns the template error when the text reads an undefined value,
    /// such as a module field while no module is known.
    fn render(
        &self,
        import_path: &str,
        module: Option<ModuleData<'_>>,
    ) -> Result<String, minijinja::Error> {
        let env = environment();
        let template = env.template_from_str(&self.source)?;
        return template.render(context! {
            ImportPath => import_path,
            Module => module,
        });
    }
}

impl DocLinker {
    /// Mark `import_path` as documented by this site, so links to it are
    /// relative.
    pub fn local_package(&mut self, import_path: &str) {
        self.local.insert(import_path.to_owned());
    }

    /// Create a linker producing `style` links to pages named `basename`.
    pub fn new(style: RelLinkStyle, basename: &str) -> Self {
        return Self {
            basename: basename.to_owned(),
            style,
            ..Self::default()
        };
    }

    /// Use `modules` for version-qualified links.
    pub fn set_modules(&mut self, modules: ModuleTree) {
        self.modules = Some(modules);
    }

    /// Use `template` for packages at `prefix` and below, unless a longer
    /// prefix has its own.
    pub fn template(&mut self, prefix: &str, template: LinkTemplate) {
        self.templates.set(prefix, template);
    }
}

impl LinkResolver for DocLinker {
    fn doc_link_url(&self, from: &str, link: &DocLink) -> String {
        let mut url = String::new();
        if !link.import_path.is_empty() {
            url.push_str(&self.package_url(from, &link.import_path));
        }
        match &link.recv {
            Some(recv) if !recv.is_empty() => {
                url.push('#');
                url.push_str(recv);
                url.push('.');
                url.push_str(&link.name);
            },
            _ if !link.name.is_empty() => {
                url.push('#');
                url.push_str(&link.name);
            },
            _ => {},
        }
        return url;
    }

    fn package_url(&self, from: &str, target: &str) -> String {
        if self.local.contains(target) {
            return self.style.normalize(&relative::path(from, target), &self.basename);
        }

        let module = self
            .modules
            .as_ref()
            .and_then(|tree| return tree.lookup_module_dep(from, target));
        let subpath = module.map_or("", |m| return module_subpath(m, target));

        if let Some(template) = self.templates.lookup(target) {
            let data = module.map(|m| {
                return ModuleData {
                    path: &m.path,
                    subpath,
                    version: &m.version,
                };
            });
            match template.render(target, data) {
                Ok(url) => return url.trim().to_owned(),
                Err(e) => {
                    tracing::debug!(
                        package = target,
                        error = %e,
                        "Link template failed; using default"
                    );
                },
            }
        }

        return match module {
            Some(m) if subpath.is_empty() => format!("{DEFAULT_HOST}{}@{}", m.path, m.version),
            Some(m) => format!("{DEFAULT_HOST}{}@{}/{subpath}", m.path, m.version),
            None => format!("{DEFAULT_HOST}{target}"),
        };
    }
}

/// Template environment shared by parsing and rendering.
fn environment<'s>() -> Environment<'s> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    return env;
}

/// Import path of `target` relative to the root of `module`.
fn module_subpath<'t>(module: &Module, target: &'t str) -> &'t str {
    return target
        .strip_prefix(module.path.as_str())
        .and_then(|rest| return rest.strip_prefix('/'))
        .unwrap_or("");
}
