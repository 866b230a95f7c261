use crate::core::error::QrForgeError;
use crate::pipeline::codec::QrPngCodec;
use crate::pipeline::input::{self, InputFormat};
use crate::pipeline::producer::Producer;
use crate::plugins::{RunContext, print_summary, run_resolution};
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
pub struct BatchCli {
    /// Input file of payloads.
    pub file: PathBuf,
    /// Input format: 'csv' or 'json' (not inferred from the extension).
    #[clap(value_name = "FORMAT", default_value = "csv")]
    pub input_format: String,
    /// Worker pool size for this run (overrides config).
    #[clap(long)]
    pub workers: Option<usize>,
}

pub fn run_batch_cli(ctx: &RunContext, cli: BatchCli) -> Result<(), QrForgeError> {
    let format: InputFormat = cli.input_format.parse()?;
    let resolution = input::resolve_batch(&cli.file, format)?;
    ctx.workspace.ensure_output_dir()?;

    let codec = QrPngCodec::from_config(&ctx.config.codec);
    let producer = Producer::new(&ctx.store, &codec, &ctx.workspace);
    let workers = cli.workers.unwrap_or(ctx.config.workers);

    let (summary, _) = run_resolution(ctx, &producer, "batch", "Batch", resolution, workers)?;

    let status = if summary.has_failures() { "partial" } else { "ok" };
    ctx.emit("batch", status, serde_json::to_value(&summary)?, || {
        print_summary(&summary)
    });
    Ok(())
}
