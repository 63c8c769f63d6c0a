//! ktguard CLI tool.
//!
//! Usage:
//! ```bash
//! ktguard check [OPTIONS] [PATHS]...
//! ktguard fix [OPTIONS] [PATHS]...
//! ktguard list-rules [--markdown]
//! ktguard init [--force]
//! ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use ktguard_core::Mode;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Exit status for errors that stop the run before any file is processed.
const FATAL_EXIT_CODE: i32 = 3;

/// Style checker and formatter for Kotlin sources
#[derive(Parser)]
#[command(name = "ktguard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "KTGUARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report style violations
    Check(RunArgs),

    /// Fix what can be fixed and report the rest
    Fix(RunArgs),

    /// List available rules
    ListRules {
        /// Print a Markdown table
        #[arg(long)]
        markdown: bool,
    },

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Options shared by `check` and `fix`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Files or directories to process (default: current directory)
    pub paths: Vec<PathBuf>,

    /// Rule preset: standard, formatting or metrics (overrides `analyzer.preset`)
    #[arg(short, long)]
    pub preset: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Group violations under their file
    #[arg(long)]
    pub group_by_file: bool,

    /// Baseline file; created when missing
    #[arg(short, long)]
    pub baseline: Option<PathBuf>,

    /// Rewrite the baseline from this run's violations
    #[arg(long, requires = "baseline")]
    pub regenerate_baseline: bool,

    /// Exclude patterns (can be specified multiple times)
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// Number of files processed in parallel
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

/// Output format for lint results.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-violation compact format.
    Compact,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            FATAL_EXIT_CODE
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Check(args) => commands::check::run(&args, Mode::Check, cli.config.as_deref()),
        Commands::Fix(args) => commands::check::run(&args, Mode::Fix, cli.config.as_deref()),
        Commands::ListRules { markdown } => {
            commands::list_rules::run(markdown);
            Ok(0)
        }
        Commands::Init { force } => commands::init::run(force).map(|()| 0),
    }
}
