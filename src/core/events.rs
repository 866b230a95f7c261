use crate::core::error;
use crate::core::time::{new_event_id, now_epoch_z};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSONL ledger of production outcomes.
///
/// Written once per run after the join point, so no locking is needed.
pub struct EventLog {
    path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProductionEvent {
    pub ts: String,
    pub event_id: String,
    pub op: String,
    pub data: String,
    pub kind: String,
    pub row: usize,
    /// `produced`, `skipped`, `failed` or `scanned`.
    pub status: String,
    pub artifact_path: Option<String>,
    pub reason: Option<String>,
}

impl ProductionEvent {
    pub fn new(op: &str, data: &str, kind: &str, row: usize, status: &str) -> Self {
        Self {
            ts: now_epoch_z(),
            event_id: new_event_id(),
            op: op.to_string(),
            data: data.to_string(),
            kind: kind.to_string(),
            row,
            status: status.to_string(),
            artifact_path: None,
            reason: None,
        }
    }
}

impl EventLog {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn append(&self, events: &[ProductionEvent]) -> Result<(), error::QrForgeError> {
        if events.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(error::QrForgeError::IoError)?;
        }

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(error::QrForgeError::IoError)?;

        for ev in events {
            writeln!(f, "{}", serde_json::to_string(ev)?).map_err(error::QrForgeError::IoError)?;
        }
        Ok(())
    }
}
