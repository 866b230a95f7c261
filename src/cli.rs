//! CLI struct definitions for the qrforge command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use crate::plugins::{OutputFormat, batch, custom, generate, lookup, scan};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "qrforge",
    version = env!("CARGO_PKG_VERSION"),
    about = "Turn payloads, CSV rows and JSON records into QR codes, once."
)]
pub(crate) struct Cli {
    /// Config file (defaults to ./qrforge.toml when present).
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    /// Output format: 'text' or 'json'.
    #[clap(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    /// Debug-level diagnostics on stderr.
    #[clap(short, long, global = true)]
    pub verbose: bool,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Generate a standard QR code for a value, or for every row of a CSV/JSON file
    Generate(generate::GenerateCli),

    /// Generate a coloured QR code
    Custom(custom::CustomCli),

    /// Generate QR codes concurrently from a CSV or JSON file
    Batch(batch::BatchCli),

    /// Decode a QR code image and record its content
    Scan(scan::ScanCli),

    /// Check whether a payload already has a QR code on file
    Lookup(lookup::LookupCli),

    /// List recently recorded QR codes
    Records(lookup::RecordsCli),

    #[clap(external_subcommand)]
    Unknown(Vec<String>),
}
