//! CLI commands for godocsite: build, list.

use std::path::PathBuf;

use crate::annotate::Strictness;
use crate::config::{Config, LinkRule};
use crate::constraint::BuildContext;
use crate::error::Error;
use crate::finder;
use crate::generate::{Generator, Options};
use crate::gomod;
use crate::link::{DocLinker, LinkTemplate, RelLinkStyle};
use crate::pathtree::{PathTree, Snapshot};
use crate::relative;
use crate::types::PackageRef;

/// Arguments for `godocsite build`.
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// File name of each generated page [default: index.html]
    #[arg(long)]
    pub basename: Option<String>,
    /// Log what is being rendered and stop on annotation mismatches
    #[arg(long)]
    pub debug: bool,
    /// Directories to search for Go packages
    #[arg(default_value = ".")]
    pub dirs: Vec<PathBuf>,
    /// Import path whose page becomes the root of the output
    #[arg(long)]
    pub home: Option<String>,
    /// List internal packages in directory listings
    #[arg(long)]
    pub internal: bool,
    /// Documentation URL template for packages under PATH
    #[arg(long = "link", value_name = "PATH=TEMPLATE", value_parser = parse_link_rule)]
    pub links: Vec<LinkRule>,
    /// Link to external packages without versions
    #[arg(long)]
    pub no_module_versions: bool,
    /// Output directory [default: _site]
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Shape of relative links between pages
    #[arg(long, value_enum, ignore_case = true)]
    pub rel_link_style: Option<RelLinkStyle>,
    /// Comma-separated build tags for selecting files
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
}

/// Arguments for `godocsite list`.
#[derive(clap::Args, Debug, Clone)]
pub struct ListArgs {
    /// Directories to search for Go packages
    #[arg(default_value = ".")]
    pub dirs: Vec<PathBuf>,
    /// Print the discovered packages as JSON
    #[arg(long)]
    pub json: bool,
    /// Comma-separated build tags for selecting files
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
}

impl BuildArgs {
    /// Apply command-line overrides to the file configuration. `--link`
    /// rules come after the file's, so they win for the same path. `--tags`
    /// add to the file's tags.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigInvalid` if the merged settings are unusable.
    pub fn merge(&self, mut config: Config) -> Result<Config, Error> {
        if let Some(basename) = &self.basename {
            config.basename.clone_from(basename);
        }
        if let Some(home) = &self.home {
            config.home.clone_from(home);
        }
        if let Some(out) = &self.out {
            config.out.clone_from(out);
        }
        if let Some(style) = self.rel_link_style {
            config.rel_link_style = style;
        }
        config.debug |= self.debug;
        config.internal |= self.internal;
        config.module_versions &= !self.no_module_versions;
        config.link.extend(self.links.iter().cloned());
        config.tags.extend(self.tags.iter().cloned());
        config.home = config.home.trim_matches('/').to_owned();

        config.validate()?;
        return Ok(config);
    }
}

/// Discover packages, resolve links and write the site.
///
/// # Errors
///
/// Returns errors from discovery, template parsing, or writing pages.
pub fn build(args: &BuildArgs, config: Config) -> Result<(), Error> {
    let config = args.merge(config)?;
    let context = BuildContext::host(&config.tags);
    let packages = finder::find_packages(&args.dirs, &context)?;
    tracing::debug!(count = packages.len(), "Discovered packages");

    let mut linker = DocLinker::new(config.rel_link_style, &config.basename);
    for package in &packages {
        if relative::descends(&config.home, &package.import_path) {
            linker.local_package(&package.import_path);
        }
    }
    for rule in &config.link {
        let path = rule.path.trim_matches('/');
        linker.template(path, LinkTemplate::parse(path, &rule.template)?);
    }
    if config.module_versions {
        let modules = gomod::build_module_tree(&packages);
        if !modules.is_empty() {
            linker.set_modules(modules);
        }
    }

    let options = Options {
        basename: config.basename.clone(),
        home: config.home.clone(),
        internal: config.internal,
        out: config.out.clone(),
        strictness: if config.debug { Strictness::Diagnostic } else { Strictness::Lenient },
        style: config.rel_link_style,
    };
    let generator = Generator::new(options, &linker);
    generator.generate(&packages)?;

    let count = generator.packages_written();
    println!("Wrote {count} packages to {}", config.out.display());
    return Ok(());
}

/// Print the package tree that `build` would render.
///
/// # Errors
///
/// Returns errors from discovery.
pub fn list(args: &ListArgs) -> Result<(), Error> {
    let packages = finder::find_packages(&args.dirs, &BuildContext::host(&args.tags))?;

    if args.json {
        // serde_json::to_string_pretty won't fail on this structure.
        let json = serde_json::to_string_pretty(&packages).unwrap_or_default();
        println!("{json}");
        return Ok(());
    }

    let mut tree = PathTree::new();
    for package in packages {
        let path = package.import_path.clone();
        tree.set(&path, package);
    }
    let mut lines = Vec::new();
    for node in tree.snapshot() {
        tree_lines(&node, "", 0, &mut lines);
    }
    for line in lines {
        println!("{line}");
    }
    return Ok(());
}

/// Parse a `--link PATH=TEMPLATE` argument.
///
/// # Errors
///
/// Returns a message if there is no `=` or the path is empty.
fn parse_link_rule(arg: &str) -> Result<LinkRule, String> {
    let Some((path, template)) = arg.split_once('=') else {
        return Err(format!("expected PATH=TEMPLATE, got {arg:?}"));
    };
    if path.trim_matches('/').is_empty() {
        return Err(format!("missing import path in {arg:?}"));
    }
    return Ok(LinkRule {
        path: path.to_owned(),
        template: template.to_owned(),
    });
}

/// One line per node: indented by depth, relative to the parent, with a
/// trailing `/` on directories that are not packages.
fn tree_lines(
    node: &Snapshot<'_, PackageRef>,
    parent: &str,
    depth: usize,
    lines: &mut Vec<String>,
) {
    let name = if parent.is_empty() {
        node.path.clone()
    } else {
        relative::path(parent, &node.path)
    };
    let suffix = if node.value.is_some() { "" } else { "/" };
    lines.push(format!("{}{name}{suffix}", "  ".repeat(depth)));
    for child in &node.children {
        tree_lines(child, &node.path, depth.saturating_add(1), lines);
    }
}
