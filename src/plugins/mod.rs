//! Command surfaces. Each module owns its clap arguments and a `run_*` entry
//! point; shared plumbing (run context, output, batch execution) lives here.

pub mod batch;
pub mod custom;
pub mod generate;
pub mod lookup;
pub mod scan;

use crate::core::config::ForgeConfig;
use crate::core::error::QrForgeError;
use crate::core::events::{EventLog, ProductionEvent};
use crate::core::records::SqliteRecordStore;
use crate::core::time::command_envelope;
use crate::core::workspace::Workspace;
use crate::pipeline::input::Resolution;
use crate::pipeline::orchestrator::Orchestrator;
use crate::pipeline::producer::{FailureStage, ItemOutcome, Outcome, Producer};
use crate::pipeline::summary::{BatchSummary, summarize};
use colored::Colorize;
use serde_json::Value as JsonValue;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Everything a command needs: resolved config, directories, and the store.
pub struct RunContext {
    pub config: ForgeConfig,
    pub workspace: Workspace,
    pub store: SqliteRecordStore,
    pub format: OutputFormat,
}

impl RunContext {
    pub fn open(config: ForgeConfig, format: OutputFormat) -> Result<Self, QrForgeError> {
        let workspace = Workspace::from_config(&config);
        let store = SqliteRecordStore::open(&workspace.data_dir)?;
        Ok(Self {
            config,
            workspace,
            store,
            format,
        })
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Print a JSON envelope in json mode; otherwise run `text`.
    pub fn emit<F>(&self, cmd: &str, status: &str, payload: JsonValue, text: F)
    where
        F: FnOnce(),
    {
        if self.is_json() {
            println!("{}", command_envelope(cmd, status, payload));
        } else {
            text();
        }
    }

    /// Ledger writes never fail a run that already produced its artifacts.
    pub fn record_events(&self, events: &[ProductionEvent]) {
        if let Err(e) = EventLog::new(&self.workspace.events_path()).append(events) {
            tracing::warn!(error = %e, "could not append to production ledger");
        }
    }
}

/// A failed single-item outcome is fatal for the command that asked for it.
pub(crate) fn single_outcome_error(outcome: &ItemOutcome) -> Option<QrForgeError> {
    match &outcome.outcome {
        Outcome::Failed { stage, reason, .. } => Some(match stage {
            FailureStage::Encode => QrForgeError::CodecError(reason.clone()),
            FailureStage::Lookup | FailureStage::Persist => {
                QrForgeError::StoreError(reason.clone())
            }
        }),
        _ => None,
    }
}

/// Fan a resolved file out over the worker pool and fold the outcomes.
pub(crate) fn run_resolution(
    ctx: &RunContext,
    producer: &Producer<'_>,
    op: &str,
    label: &str,
    resolution: Resolution,
    workers: usize,
) -> Result<(BatchSummary, Vec<ItemOutcome>), QrForgeError> {
    let Resolution { items, dropped, .. } = resolution;
    let outcomes = Orchestrator::new(workers)?.run_all(producer, items);

    let events: Vec<ProductionEvent> = outcomes.iter().map(|o| o.to_event(op)).collect();
    ctx.record_events(&events);

    Ok((summarize(label, &outcomes, &dropped), outcomes))
}

pub(crate) fn print_summary(summary: &BatchSummary) {
    let headline = if summary.has_failures() {
        summary.message.yellow().bold()
    } else {
        summary.message.green().bold()
    };
    println!("{}", headline);
    for line in summary.diagnostics() {
        println!("  {} {}", "-".bright_black(), line);
    }
}
