//! qrforge: payloads in, QR codes out, each payload produced once.
//!
//! **qrforge is a local batch tool.** It resolves a literal value, a CSV file or
//! a JSON file into work items, checks each against a SQLite record store, and
//! only encodes the payloads it has never seen before.
//!
//! # Pipeline
//!
//! 1. **Resolve** ([`pipeline::input`]): the argument becomes work items; bad
//!    rows are dropped with a reason instead of failing the run.
//! 2. **Produce** ([`pipeline::producer`]): store hit => skip, miss => encode and
//!    claim the record atomically.
//! 3. **Fan out** ([`pipeline::orchestrator`]): file runs go through a bounded
//!    worker pool; every item finishes before the command reports.
//! 4. **Summarize** ([`pipeline::summary`]): produced / skipped / failed /
//!    dropped counts plus one diagnostic per drop and failure.
//!
//! # Examples
//!
//! ```bash
//! qrforge generate "hello@x.com"
//! qrforge generate contacts.csv
//! qrforge custom "wifi:guest" purple --background "#ffe"
//! qrforge batch rows.json json --workers 16
//! qrforge scan output/qr_01j....png
//! qrforge lookup "hello@x.com"
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: configuration, errors, logging, SQLite plumbing, record store
//! - [`pipeline`]: resolution, production, orchestration, aggregation, codec
//! - [`plugins`]: one module per CLI command

pub mod core;
pub mod pipeline;
pub mod plugins;

mod cli;

use cli::{Cli, Command};
use crate::core::{config, error, logging};
use plugins::{RunContext, batch, custom, generate, lookup, scan};

use clap::Parser;

pub fn run() -> Result<(), error::QrForgeError> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Command::Unknown(args) = &cli.command {
        let name = args.first().map(String::as_str).unwrap_or_default();
        tracing::warn!(command = name, "unknown command");
        println!("Unknown command: {}", name);
        return Ok(());
    }

    let current_dir = std::env::current_dir()?;
    match dotenvy::from_path(current_dir.join(".env")) {
        Ok(()) => tracing::debug!("loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env"),
    }

    let config = config::load_config(cli.config.as_deref(), &current_dir)?;
    tracing::debug!(?config, "configuration resolved");
    let ctx = RunContext::open(config, cli.format)?;

    let result = match cli.command {
        Command::Generate(args) => generate::run_generate_cli(&ctx, args),
        Command::Custom(args) => custom::run_custom_cli(&ctx, args),
        Command::Batch(args) => batch::run_batch_cli(&ctx, args),
        Command::Scan(args) => scan::run_scan_cli(&ctx, args),
        Command::Lookup(args) => lookup::run_lookup_cli(&ctx, args),
        Command::Records(args) => lookup::run_records_cli(&ctx, args),
        Command::Unknown(_) => Ok(()),
    };
    if let Err(e) = &result
        && e.is_invalid_input()
    {
        tracing::warn!("input rejected, nothing was produced");
    }
    result
}
