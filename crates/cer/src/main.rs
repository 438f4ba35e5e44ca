//! CER CLI - report generation and export.
//!
//! Provides commands for:
//! - `export`: Render a report to PDF, Word and HTML
//! - `preview`: Write a quick HTML preview of a report
//! - `generate`: Generate a report from notes, optionally exporting it

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ExportArgs, GenerateArgs, PreviewArgs};
use output::Output;

/// CER - structured report generation and export.
#[derive(Parser)]
#[command(name = "cer", version, about)]
struct Cli {
    /// Enable verbose output (diagram warnings and stage logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a report to PDF, Word or HTML.
    Export(ExportArgs),
    /// Write an HTML preview of a report.
    Preview(PreviewArgs),
    /// Generate a report from notes.
    Generate(GenerateArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Export(args) => args.execute(),
        Commands::Preview(args) => args.execute(),
        Commands::Generate(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&err);
        std::process::exit(1);
    }
}
