//! tb CLI - interactive textbook compiler.
//!
//! Provides commands for:
//! - `build`: Compile every chapter under the content directory
//! - `compile`: Compile one file and print the result as JSON

mod commands;
mod error;
mod math;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, CompileArgs};
use output::Output;

/// Application version from Cargo.toml.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// tb - interactive textbook compiler.
#[derive(Parser)]
#[command(name = "tb", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every chapter and write the build output.
    Build(BuildArgs),
    /// Compile a single Markdown file and print it as JSON.
    Compile(CompileArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = match &cli.command {
        Commands::Build(args) => args.verbose,
        Commands::Compile(args) => args.verbose,
    };

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = match cli.command {
        Commands::Build(args) => rt.block_on(args.execute(VERSION)),
        Commands::Compile(args) => rt.block_on(args.execute(VERSION)),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
