/// Crate-level error types for godocsite.
use std::path::PathBuf;

/// All errors in godocsite carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, path, or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `.godocsite.toml` parsed but holds a value we cannot use.
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// Description of the offending setting.
        reason: String,
    },

    /// A path handed to us on the command line does not exist.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file or directory.
        path: PathBuf,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// A `go.mod` file exists but cannot be understood.
    #[error("invalid manifest: {}: {reason}", path.display())]
    ManifestInvalid {
        /// Manifest that failed to parse.
        path: PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// Discovery found nothing to document.
    #[error("no Go packages found under {}", display_paths(roots))]
    NoPackages {
        /// Directories that were searched.
        roots: Vec<PathBuf>,
    },

    /// Tree-sitter failed to parse a source file or declaration.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File (or synthetic name) that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// A package documentation URL template cannot be used.
    #[error("bad link template `{path}={template}`: {reason}")]
    TemplateInvalid {
        /// Import path prefix the template was registered for.
        path: String,
        /// Description of the problem.
        reason: String,
        /// Raw template text.
        template: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),
}

/// Paths joined for display in a message.
fn display_paths(paths: &[PathBuf]) -> String {
    let shown: Vec<String> = paths.iter().map(|p| return p.display().to_string()).collect();
    return shown.join(", ");
}
