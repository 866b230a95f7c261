use crate::core::error::QrForgeError;
use crate::pipeline::codec::QrPngCodec;
use crate::pipeline::input::{self, InputSource};
use crate::pipeline::orchestrator::run_single;
use crate::pipeline::producer::{Outcome, Producer};
use crate::plugins::{RunContext, print_summary, run_resolution, single_outcome_error};
use colored::Colorize;

#[derive(clap::Args, Debug)]
pub struct GenerateCli {
    /// Payload to encode, or a `.csv` / `.json` file of payloads.
    pub value: String,
}

pub fn run_generate_cli(ctx: &RunContext, cli: GenerateCli) -> Result<(), QrForgeError> {
    let resolution = input::resolve(&cli.value)?;
    ctx.workspace.ensure_output_dir()?;

    let codec = QrPngCodec::from_config(&ctx.config.codec);
    let producer = Producer::new(&ctx.store, &codec, &ctx.workspace);

    if !resolution.is_file() {
        let Some(item) = resolution.items.into_iter().next() else {
            return Err(QrForgeError::InvalidInput("data can not be empty".into()));
        };
        let outcome = run_single(&producer, item);
        ctx.record_events(&[outcome.to_event("generate")]);
        if let Some(err) = single_outcome_error(&outcome) {
            return Err(err);
        }

        let payload = serde_json::to_value(&outcome)?;
        ctx.emit("generate", outcome.outcome.status(), payload, || {
            match &outcome.outcome {
                Outcome::Produced { artifact_path } => println!(
                    "{} {}",
                    "Standard QR generated at:".bright_green(),
                    artifact_path.display()
                ),
                Outcome::Skipped { artifact_path } => println!(
                    "{} {}",
                    "Found in DB, QR at:".bright_cyan(),
                    artifact_path.display()
                ),
                Outcome::Failed { .. } => {}
            }
        });
        return Ok(());
    }

    let label = match resolution.source {
        InputSource::Structured(_) => "JSON batch",
        _ => "CSV batch",
    };
    let (summary, _) = run_resolution(
        ctx,
        &producer,
        "generate",
        label,
        resolution,
        ctx.config.workers,
    )?;

    let status = if summary.has_failures() { "partial" } else { "ok" };
    ctx.emit("generate", status, serde_json::to_value(&summary)?, || {
        print_summary(&summary)
    });
    Ok(())
}
