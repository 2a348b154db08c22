//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to the build,
//! serve and tasks commands.

mod build;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::config::CliOverrides;
use crate::mode::Mode;

pub use build::GlobalOptions;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// assetflow - compile styles, scripts, templates and images into dist/
#[derive(Parser)]
#[command(name = "aflow")]
#[command(about = "assetflow - front-end asset pipeline with a live-reloading dev server")]
#[command(version)]
pub struct Cli {
    /// Path to assetflow.toml (default: search upward from the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Build mode: dev, prod or bare (default: $ASSETFLOW_ENV)
    #[arg(long, global = true)]
    pub mode: Option<Mode>,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean dist/ and build every asset once
    Build {
        /// Source directory (overrides paths.src)
        #[arg(long)]
        src: Option<PathBuf>,

        /// Output directory (overrides paths.dist)
        #[arg(long)]
        dist: Option<PathBuf>,
    },

    /// Build, then serve dist/ with live reload and watch the sources
    Serve {
        /// Port to listen on (overrides server.port)
        #[arg(long)]
        port: Option<u16>,

        /// Host to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,
    },

    /// Print the build and serve task graphs
    Tasks,
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` selects the filter; without it the level is `info`, or
/// `debug` for this crate with `--verbose`.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info,assetflow=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_INVALID_ARGS } else { EXIT_SUCCESS };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    init_logging(cli.verbose);

    let options = GlobalOptions { config: cli.config, mode: cli.mode };

    match cli.command.unwrap_or(Commands::Serve { port: None, host: None }) {
        Commands::Build { src, dist } => {
            build::run_build(&options, &CliOverrides { src, dist, ..Default::default() })
        }
        Commands::Serve { port, host } => {
            build::run_serve(&options, &CliOverrides { port, host, ..Default::default() })
        }
        Commands::Tasks => build::run_tasks(),
    }
}
