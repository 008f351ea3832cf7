/// Core domain types shared between discovery, parsing, and generation.
use std::path::PathBuf;

/// A package found during discovery. Holds what is needed to load it later;
/// nothing has been parsed yet.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PackageRef {
    /// Non-test `.go` files in the package, sorted.
    pub files: Vec<PathBuf>,
    /// Unique hierarchical identifier, e.g. `example.com/foo/bar`.
    pub import_path: String,
    /// Module this package belongs to, when a `go.mod` was found above it.
    pub module: Option<ModuleRef>,
    /// Package name. Starts as the directory name; parsing reads the real one.
    pub name: String,
    /// `_test.go` files in the directory, sorted. Read only for examples.
    pub test_files: Vec<PathBuf>,
}

/// The module a package was discovered in.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ModuleRef {
    /// Location of the `go.mod` file.
    pub manifest: PathBuf,
    /// Module path declared by the `module` directive.
    pub path: String,
}
