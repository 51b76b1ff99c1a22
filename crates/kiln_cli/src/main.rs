//! The Kiln command-line interface. Drives the scanning passes over a project directory.
//!
//! Provides `kiln scan` for one automoc pass over the project's C++ sources
//! and `kiln modules` for C++ module facts and a module build order. Module
//! facts are persisted in the project's scan cache between invocations.

#![warn(missing_docs)]

mod modules;
mod pipeline;
mod scan;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Kiln: incremental dependency scanning for C++ projects.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Kiln build scanner")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `kiln.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one automoc pass and report generated companions.
    Scan(ScanArgs),
    /// Extract C++ module facts and print a module build order.
    Modules(ModulesArgs),
}

/// Arguments for the `kiln scan` subcommand.
#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Directory for generated companions (default: `<cache_dir>/generated`).
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Output format for the pass summary.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `kiln modules` subcommand.
#[derive(Parser, Debug)]
pub struct ModulesArgs {
    /// Ignore persisted scan results and rescan every unit.
    #[arg(long)]
    pub fresh: bool,

    /// Output format for the module listing.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Summary output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Scan(ref args) => scan::run(args, &global),
        Command::Modules(ref args) => modules::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
