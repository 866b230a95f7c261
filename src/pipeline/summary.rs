//! Folds per-item outcomes (and resolver drops) into a [`BatchSummary`].

use crate::pipeline::input::DroppedRow;
use crate::pipeline::producer::{FailureStage, ItemOutcome, Outcome};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Longest payload echoed in a diagnostic line.
const DIAGNOSTIC_DATA_CHARS: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureDetail {
    pub row: usize,
    pub data: String,
    pub stage: FailureStage,
    pub reason: String,
    pub orphan: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Produced plus skipped: every item whose request was satisfied.
    pub processed: usize,
    pub produced: usize,
    pub skipped: usize,
    pub failed: usize,
    pub dropped: usize,
    pub message: String,
    pub failures: Vec<FailureDetail>,
    pub drops: Vec<DroppedRow>,
}

impl BatchSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// One line per dropped row and per failed item, for terminal output.
    pub fn diagnostics(&self) -> Vec<String> {
        let drops = self
            .drops
            .iter()
            .map(|d| format!("row {}: skipped, {}", d.row, d.reason));
        let failures = self.failures.iter().map(|f| {
            let mut line = format!(
                "row {}: failed for '{}' ({}): {}",
                f.row,
                compact_line(&f.data, DIAGNOSTIC_DATA_CHARS),
                f.stage,
                f.reason
            );
            if let Some(orphan) = &f.orphan {
                line.push_str(&format!(" [unrecorded artifact {}]", orphan.display()));
            }
            line
        });
        drops.chain(failures).collect()
    }
}

/// Collapse whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

pub fn summarize(label: &str, outcomes: &[ItemOutcome], dropped: &[DroppedRow]) -> BatchSummary {
    let mut produced = 0;
    let mut skipped = 0;
    let mut failures = Vec::new();

    for o in outcomes {
        match &o.outcome {
            Outcome::Produced { .. } => produced += 1,
            Outcome::Skipped { .. } => skipped += 1,
            Outcome::Failed {
                stage,
                reason,
                orphan,
            } => {
                warn!(row = o.item.row, data = %o.item.data, %stage, %reason, "item failed");
                failures.push(FailureDetail {
                    row: o.item.row,
                    data: o.item.data.clone(),
                    stage: *stage,
                    reason: reason.clone(),
                    orphan: orphan.clone(),
                });
            }
        }
    }

    let processed = produced + skipped;
    let failed = failures.len();
    let message = format!(
        "{} completed! {} QR codes processed ({} generated, {} already on file, {} failed, {} rows skipped).",
        label,
        processed,
        produced,
        skipped,
        failed,
        dropped.len()
    );
    info!(processed, produced, skipped, failed, dropped = dropped.len(), "{}", label);

    BatchSummary {
        processed,
        produced,
        skipped,
        failed,
        dropped: dropped.len(),
        message,
        failures,
        drops: dropped.to_vec(),
    }
}
