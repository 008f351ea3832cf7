//! Package discovery: find directories holding Go source and work out
//! their import paths from the `go.mod` files above them.
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::constraint::BuildContext;
use crate::error::Error;
use crate::gomod;
use crate::pathtree::PathTree;
use crate::types::{ModuleRef, PackageRef};

/// Directory names the Go tool never treats as packages.
const SKIPPED_DIRS: [&str; 2] = ["testdata", "vendor"];

/// A module root found during the walk.
#[derive(Debug, Clone)]
struct ModuleRoot {
    /// `/`-separated directory of the `go.mod`, relative to the walk root.
    dir: String,
    /// The module itself.
    module: ModuleRef,
}

/// Go files of one directory, split by kind.
#[derive(Debug, Default)]
struct SourceFiles {
    /// Non-test files.
    sources: Vec<PathBuf>,
    /// `_test.go` files.
    tests: Vec<PathBuf>,
}

/// Find every Go package under `roots`, in sorted order per root.
///
/// A directory is a package if it directly holds at least one non-test
/// `.go` file that `context` selects. Its `_test.go` files are kept
/// alongside for their examples. Its import path is its module path plus
/// its location inside the module; outside any module it is its location
/// relative to the root.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if a root does not exist, or
/// `Error::NoPackages` if nothing was found at all.
pub fn find_packages(roots: &[PathBuf], context: &BuildContext) -> Result<Vec<PackageRef>, Error> {
    let mut packages = Vec::new();
    let mut seen = HashSet::new();

    for root in roots {
        if !root.is_dir() {
            return Err(Error::FileNotFound { path: root.clone() });
        }
        for package in find_in_root(root, context) {
            if !seen.insert(package.import_path.clone()) {
                tracing::warn!(
                    import_path = %package.import_path,
                    root = %root.display(),
                    "Skipping duplicate package"
                );
                continue;
            }
            packages.push(package);
        }
    }

    if packages.is_empty() {
        return Err(Error::NoPackages { roots: roots.to_vec() });
    }
    return Ok(packages);
}

/// Walk one root.
fn find_in_root(root: &Path, context: &BuildContext) -> Vec<PackageRef> {
    let mut modules: PathTree<ModuleRoot> = PathTree::new();
    let mut dirs: BTreeMap<String, SourceFiles> = BTreeMap::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| return e.depth() == 0 || !is_skipped_dir(e));
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable path");
                continue;
            },
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let dir = path.parent().map(|p| return slash_path(root, p)).unwrap_or_default();
        let file_name = entry.file_name().to_string_lossy();

        if file_name == "go.mod" {
            if let Some(module) = read_module(path) {
                tracing::debug!(module = %module.path, dir = %dir, "Found module");
                modules.set(&dir, ModuleRoot { dir: dir.clone(), module });
            }
        } else if is_go_file(&file_name) {
            if !context.matches_file(path) {
                tracing::debug!(path = %path.display(), "Excluded by build constraints");
                continue;
            }
            let files = dirs.entry(dir).or_default();
            if file_name.ends_with("_test.go") {
                files.tests.push(path.to_path_buf());
            } else {
                files.sources.push(path.to_path_buf());
            }
        }
    }

    return dirs
        .into_iter()
        .filter(|(_, files)| return !files.sources.is_empty())
        .map(|(dir, files)| {
            let module = modules.lookup(&dir);
            let import_path = match module {
                Some(root_module) => {
                    join_import_path(&root_module.module.path, &subpath(&root_module.dir, &dir))
                },
                None if dir.is_empty() => root_name(root),
                None => dir.clone(),
            };
            let name = import_path.rsplit('/').next().unwrap_or(&import_path).to_owned();
            return PackageRef {
                files: files.sources,
                import_path,
                module: module.map(|m| return m.module.clone()),
                name,
                test_files: files.tests,
            };
        })
        .collect();
}

/// Read the module path declared by a `go.mod`, logging failures.
fn read_module(path: &Path) -> Option<ModuleRef> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot read go.mod");
            return None;
        },
    };
    let Some(module_path) = gomod::module_path(&content) else {
        tracing::warn!(
            path = %path.display(),
            "go.mod has no module directive; treating directory as module-less"
        );
        return None;
    };
    return Some(ModuleRef {
        manifest: path.to_path_buf(),
        path: module_path,
    });
}

/// Whether a walk entry is a directory the Go tool ignores.
fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    let name: &str = &name;
    return name.starts_with('.') || name.starts_with('_') || SKIPPED_DIRS.contains(&name);
}

/// Whether a file name is Go source the Go tool would read.
fn is_go_file(name: &str) -> bool {
    return name.ends_with(".go") && !name.starts_with('.') && !name.starts_with('_');
}

/// `path` relative to `root`, `/`-separated. Empty for the root itself.
fn slash_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .map(|c| return c.as_os_str().to_string_lossy().into_owned())
        .collect();
    return parts.join("/");
}

/// `dir` relative to the module directory `module_dir`.
fn subpath(module_dir: &str, dir: &str) -> String {
    if module_dir.is_empty() {
        return dir.to_owned();
    }
    return dir
        .strip_prefix(module_dir)
        .map(|rest| return rest.trim_start_matches('/'))
        .unwrap_or(dir)
        .to_owned();
}

/// `base/rest`, or `base` when `rest` is empty.
fn join_import_path(base: &str, rest: &str) -> String {
    if rest.is_empty() {
        return base.to_owned();
    }
    return format!("{base}/{rest}");
}

/// Name to use for a module-less root directory.
fn root_name(root: &Path) -> String {
    let absolute = std::fs::canonicalize(root).unwrap_or_else(|_| return root.to_path_buf());
    return absolute
        .file_name()
        .map_or_else(|| return "root".to_owned(), |n| return n.to_string_lossy().into_owned());
}
