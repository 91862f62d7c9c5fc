//! # battmo-validate entry point
//!
//! Parses command-line arguments, installs the tracing subscriber, and runs
//! the validate command.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use battmo_cli::validate::{run_validate, ValidateArgs};

/// Validate a battery simulation input file against the JSON Schema set.
///
/// Configuration is read from BATTMO_DIR, BATTMO_SCHEMA_DIR,
/// BATTMO_ROOT_SCHEMA and BATTMO_SCHEMA_BASE_URI; flags override them.
#[derive(Parser, Debug)]
#[command(name = "battmo-validate", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    args: ValidateArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run_validate(&cli.args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
