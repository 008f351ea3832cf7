//! Module version information for workspaces with one or more `go.mod` files.
//!
//! A workspace (a monorepo, say) may hold several modules that each pin the
//! same dependency to a different version. Which version a link should point
//! at depends on who is linking, so lookups are two-level:
//!
//! - the source import path selects the nearest `go.mod` above it;
//! - the target import path selects the nearest dependency of that `go.mod`.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::Error;
use crate::pathtree::PathTree;
use crate::types::PackageRef;

/// A resolved dependency: module path and the version in use.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Module {
    /// Module path, e.g. `go.uber.org/zap`.
    pub path: String,
    /// Module version, e.g. `v1.27.1`. May be a pseudo-version.
    pub version: String,
}

/// Dependencies of a single `go.mod`, keyed by module path.
type DependencySet = PathTree<Module>;

/// Module dependencies of every manifest in the workspace.
///
/// Populated once before rendering and only read afterwards.
#[derive(Debug, Default)]
pub struct ModuleTree {
    /// Key: path at which a `go.mod` lives (its module path).
    sources: PathTree<DependencySet>,
}

impl ModuleTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Whether no manifest has been registered.
    pub fn is_empty(&self) -> bool {
        return self.sources.is_empty();
    }

    /// Register the resolved dependencies of the manifest owning `manifest_path`.
    ///
    /// Registering the same path again replaces its whole dependency set.
    /// An empty manifest path, and dependencies with an empty module path,
    /// are skipped.
    pub fn put_module_deps(&mut self, manifest_path: &str, deps: Vec<Module>) {
        if manifest_path.is_empty() {
            return;
        }

        let mut set = DependencySet::new();
        for dep in deps {
            if dep.path.is_empty() {
                continue;
            }
            let path = dep.path.clone();
            set.set(&path, dep);
        }
        self.sources.set(manifest_path, set);
    }

    /// Find the module that `target` belongs to, as a dependency of the
    /// manifest that owns `source`.
    ///
    /// `source` may be any package inside a registered module, and `target`
    /// may be any package inside a dependency: `go.uber.org/zap/zaptest`
    /// resolves to the pinned `go.uber.org/zap`.
    pub fn lookup_module_dep(&self, source: &str, target: &str) -> Option<&Module> {
        return self.sources.lookup(source)?.lookup(target);
    }
}

/// What we read out of a `go.mod` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Requirements with replacements already applied.
    pub deps: Vec<Module>,
    /// Path from the `module` directive.
    pub module_path: String,
}

/// Directive block currently open while reading a manifest.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Block {
    /// Inside `(...)` of a directive we don't care about.
    Other,
    /// Inside `replace (...)`.
    Replace,
    /// Inside `require (...)`.
    Require,
    /// Not inside any block.
    Top,
}

/// Parse a `go.mod` file.
///
/// Replacements that point at another module version override the required
/// version. Replacements with a local directory target are ignored, since
/// they have no published documentation to link to.
///
/// # Errors
///
/// Returns `Error::ManifestInvalid` if the `module` directive is missing or a
/// `require`/`replace` line is malformed.
pub fn parse_manifest(path: &Path, content: &str) -> Result<Manifest, Error> {
    let mut module_path = None;
    let mut requires: Vec<Module> = Vec::new();
    let mut replacements: HashMap<String, String> = HashMap::new();
    let mut block = Block::Top;

    for (index, raw) in content.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        let invalid = |reason: &str| {
            return Error::ManifestInvalid {
                path: path.to_path_buf(),
                reason: format!("line {}: {reason}", index.saturating_add(1)),
            };
        };

        if block != Block::Top {
            if line == ")" {
                block = Block::Top;
                continue;
            }
            match block {
                Block::Replace => read_replace(line, &mut replacements)
                    .ok_or_else(|| return invalid("malformed replace"))?,
                Block::Require => requires.push(
                    read_require(line).ok_or_else(|| return invalid("malformed require"))?,
                ),
                Block::Other | Block::Top => {},
            }
            continue;
        }

        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        match (verb, rest) {
            ("module", _) => module_path = Some(unquote(rest).to_owned()),
            ("require", "(") => block = Block::Require,
            ("require", _) => requires.push(
                read_require(rest).ok_or_else(|| return invalid("malformed require"))?,
            ),
            ("replace", "(") => block = Block::Replace,
            ("replace", _) => read_replace(rest, &mut replacements)
                .ok_or_else(|| return invalid("malformed replace"))?,
            (_, "(") => block = Block::Other,
            _ => {},
        }
    }

    let Some(module_path) = module_path.filter(|p| return !p.is_empty()) else {
        return Err(Error::ManifestInvalid {
            path: path.to_path_buf(),
            reason: "no module directive".to_owned(),
        });
    };

    let deps = requires
        .into_iter()
        .map(|mut dep| {
            if let Some(version) = replacements.get(&dep.path) {
                dep.version.clone_from(version);
            }
            return dep;
        })
        .collect();

    return Ok(Manifest { deps, module_path });
}

/// Read only the module path out of a manifest, ignoring everything else.
pub fn module_path(content: &str) -> Option<String> {
    return content.lines().find_map(|raw| {
        let line = strip_comment(raw).trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let path = unquote(rest.trim());
        return (!path.is_empty()).then(|| return path.to_owned());
    });
}

/// Read the manifest of every module the given packages belong to and
/// collect their dependencies.
///
/// A manifest that cannot be read or parsed is logged and skipped; links
/// from that module fall back to unversioned URLs.
pub fn build_module_tree(packages: &[PackageRef]) -> ModuleTree {
    let mut tree = ModuleTree::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for module in packages.iter().filter_map(|p| return p.module.as_ref()) {
        if !seen.insert(module.path.as_str()) {
            continue;
        }

        let manifest = std::fs::read_to_string(&module.manifest)
            .map_err(Error::from)
            .and_then(|content| return parse_manifest(&module.manifest, &content));
        match manifest {
            Ok(manifest) => {
                tracing::debug!(
                    module = %module.path,
                    deps = manifest.deps.len(),
                    "Loaded module dependencies"
                );
                tree.put_module_deps(&module.path, manifest.deps);
            },
            Err(e) => {
                tracing::warn!(
                    manifest = %module.manifest.display(),
                    error = %e,
                    "Ignoring unreadable go.mod; links from this module will not be versioned"
                );
            },
        }
    }

    return tree;
}

/// Parse `path version` from a require line.
fn read_require(line: &str) -> Option<Module> {
    let mut fields = line.split_whitespace();
    let path = unquote(fields.next()?);
    let version = unquote(fields.next()?);
    return Some(Module {
        path: path.to_owned(),
        version: version.to_owned(),
    });
}

/// Parse `old [version] => new [version]` and record versioned targets.
fn read_replace(line: &str, replacements: &mut HashMap<String, String>) -> Option<()> {
    let (old, new) = line.split_once("=>")?;
    let old_path = unquote(old.split_whitespace().next()?);

    let mut new_fields = new.split_whitespace();
    new_fields.next()?;
    if let Some(version) = new_fields.next() {
        replacements.insert(old_path.to_owned(), unquote(version).to_owned());
    }
    return Some(());
}

/// Drop a trailing `//` comment.
fn strip_comment(line: &str) -> &str {
    return line.split_once("//").map_or(line, |(code, _)| return code);
}

/// Remove surrounding double quotes or backquotes, if present.
fn unquote(s: &str) -> &str {
    return s
        .strip_prefix('"')
        .and_then(|s| return s.strip_suffix('"'))
        .or_else(|| return s.strip_prefix('`').and_then(|s| return s.strip_suffix('`')))
        .unwrap_or(s);
}
