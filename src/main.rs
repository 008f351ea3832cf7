mod annotate;
mod assemble;
mod code;
mod commands;
mod config;
mod constraint;
mod error;
mod finder;
mod generate;
mod gomod;
mod grammar;
mod lexer;
mod link;
mod pathtree;
mod relative;
mod render;
mod source;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{BuildArgs, ListArgs};

#[derive(Parser)]
#[command(name = "godocsite", version, about = "Static HTML documentation sites for Go packages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate HTML documentation for every package found
    Build(BuildArgs),
    /// Print the package tree that build would render
    List(ListArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config::Config::load(&PathBuf::from(".")) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        },
    };

    let debug = config.debug || matches!(&cli.command, Commands::Build(args) if args.debug);
    init_logging(debug);

    let result = match &cli.command {
        Commands::Build(args) => commands::build(args, config),
        Commands::List(args) => commands::list(args),
    };
    return match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        },
    };
}

/// Send logs to stderr. `--debug` shows everything at debug level and
/// above; otherwise `RUST_LOG` decides, defaulting to warnings.
fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| return EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
