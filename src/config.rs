use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::link::RelLinkStyle;

/// File name looked up in the working directory.
pub const FILE_NAME: &str = ".godocsite.toml";

/// Site configuration loaded from `.godocsite.toml`. Every key is optional;
/// command-line flags are applied on top.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Page file name within each output directory.
    pub basename: String,
    /// Verbose logging.
    pub debug: bool,
    /// Import path that maps to the output root.
    pub home: String,
    /// List internal packages in directory listings.
    pub internal: bool,
    /// Documentation URL templates for non-local packages.
    pub link: Vec<LinkRule>,
    /// Read `go.mod` files to produce versioned external links.
    pub module_versions: bool,
    /// Output directory.
    pub out: PathBuf,
    /// Shape of relative links.
    pub rel_link_style: RelLinkStyle,
    /// Extra build tags when selecting files.
    pub tags: Vec<String>,
}

/// A `[[link]]` table: a template applied to an import path and
/// everything below it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkRule {
    /// Import path prefix.
    pub path: String,
    /// URL template.
    pub template: String,
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            basename: "index.html".to_owned(),
            debug: false,
            home: String::new(),
            internal: false,
            link: Vec::new(),
            module_versions: true,
            out: PathBuf::from("_site"),
            rel_link_style: RelLinkStyle::Plain,
            tags: Vec::new(),
        };
    }
}

impl Config {
    /// Load config from `.godocsite.toml` in the given root directory.
    /// Returns the defaults if the file doesn't exist.
    /// Returns an error if the file exists but is malformed, never silently
    /// falling back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// `Error::TomlDe` if the TOML is malformed, or `Error::ConfigInvalid`
    /// if a value is unusable.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(FILE_NAME);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
        };

        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded config");
        return Ok(config);
    }

    /// Check values that deserialize fine but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigInvalid` for an empty or nested basename, or a
    /// link rule without a path.
    pub fn validate(&self) -> Result<(), Error> {
        if self.basename.is_empty() || self.basename.contains(['/', '\\']) {
            return Err(Error::ConfigInvalid {
                reason: format!("basename must be a plain file name, got {:?}", self.basename),
            });
        }
        if let Some(rule) = self.link.iter().find(|r| return r.path.trim_matches('/').is_empty()) {
            return Err(Error::ConfigInvalid {
                reason: format!("link template {:?} has no path", rule.template),
            });
        }
        return Ok(());
    }
}
