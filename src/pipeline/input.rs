//! Input resolution: literal values, delimited (CSV) and structured (JSON) files
//! become a uniform list of [`WorkItem`]s.
//!
//! Rows that cannot become a work item are not errors. They are returned as
//! [`DroppedRow`]s next to the items so every row's fate stays inspectable.

use crate::core::error::QrForgeError;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_KIND: &str = "standard";

const DATA_FIELD: &str = "data";
const TYPE_FIELD: &str = "type";

/// One request to produce (or find) an artifact for a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItem {
    /// Trimmed, never empty.
    pub data: String,
    pub kind: String,
    /// Zero-based data-row (CSV) or element (JSON) index; 0 for literals.
    pub row: usize,
}

impl WorkItem {
    pub fn new(raw_data: &str, kind: Option<&str>, row: usize) -> Result<Self, QrForgeError> {
        let data = raw_data.trim();
        if data.is_empty() {
            return Err(QrForgeError::InvalidInput(
                "data can not be empty".to_string(),
            ));
        }
        let kind = kind
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or(DEFAULT_KIND);
        Ok(Self {
            data: data.to_string(),
            kind: kind.to_string(),
            row,
        })
    }

    pub fn literal(raw: &str) -> Result<Self, QrForgeError> {
        Self::new(raw, None, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DropReason {
    /// Row is shorter than the data column index.
    InsufficientColumns { columns: usize },
    MissingData,
    EmptyData,
    Unreadable { detail: String },
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::InsufficientColumns { columns } => {
                write!(f, "insufficient columns ({})", columns)
            }
            DropReason::MissingData => write!(f, "missing 'data'"),
            DropReason::EmptyData => write!(f, "empty 'data'"),
            DropReason::Unreadable { detail } => write!(f, "unreadable row: {}", detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRow {
    pub row: usize,
    #[serde(flatten)]
    pub reason: DropReason,
}

impl DroppedRow {
    fn new(row: usize, reason: DropReason) -> Self {
        warn!(row, %reason, "skipping row");
        Self { row, reason }
    }
}

/// Explicit file format selector for batch mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(InputFormat::Csv),
            "json" => Some(InputFormat::Json),
            _ => None,
        }
    }
}

impl FromStr for InputFormat {
    type Err = QrForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(InputFormat::Csv),
            "json" => Ok(InputFormat::Json),
            other => Err(QrForgeError::InvalidInput(format!(
                "unsupported format: '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "path", rename_all = "snake_case")]
pub enum InputSource {
    Literal,
    Delimited(PathBuf),
    Structured(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub source: InputSource,
    pub items: Vec<WorkItem>,
    pub dropped: Vec<DroppedRow>,
}

impl Resolution {
    /// Files fan out through the orchestrator; literals go straight to the producer.
    pub fn is_file(&self) -> bool {
        !matches!(self.source, InputSource::Literal)
    }
}

/// Classify `argument` and turn it into work items.
///
/// An existing `.csv`/`.json` file is parsed; anything else (missing path,
/// directory, other extension) is the literal payload itself.
pub fn resolve(argument: &str) -> Result<Resolution, QrForgeError> {
    let path = Path::new(argument);
    if path.is_file()
        && let Some(format) = InputFormat::from_extension(path)
    {
        return resolve_file(path, format);
    }

    Ok(Resolution {
        source: InputSource::Literal,
        items: vec![WorkItem::literal(argument)?],
        dropped: Vec::new(),
    })
}

/// Batch-mode resolution with an explicit format. Zero resulting items is an error.
pub fn resolve_batch(path: &Path, format: InputFormat) -> Result<Resolution, QrForgeError> {
    let resolution = resolve_file(path, format)?;
    if resolution.items.is_empty() {
        return Err(QrForgeError::InvalidInput(
            "no valid records found in input".to_string(),
        ));
    }
    Ok(resolution)
}

pub fn resolve_file(path: &Path, format: InputFormat) -> Result<Resolution, QrForgeError> {
    let bytes = fs::read(path).map_err(|e| {
        QrForgeError::InvalidInput(format!("failed to open {}: {}", path.display(), e))
    })?;

    let (items, dropped) = match format {
        InputFormat::Csv => parse_delimited(bytes.as_slice())?,
        InputFormat::Json => parse_structured(&bytes)?,
    };
    let source = match format {
        InputFormat::Csv => InputSource::Delimited(path.to_path_buf()),
        InputFormat::Json => InputSource::Structured(path.to_path_buf()),
    };

    tracing::debug!(
        path = %path.display(),
        items = items.len(),
        dropped = dropped.len(),
        "resolved input file"
    );
    Ok(Resolution {
        source,
        items,
        dropped,
    })
}

fn header_matches(header: &str, name: &str) -> bool {
    header
        .trim_start_matches('\u{feff}')
        .trim()
        .eq_ignore_ascii_case(name)
}

/// Parse CSV with a header row carrying a required `data` column and an
/// optional `type` column.
pub fn parse_delimited<R: Read>(
    reader: R,
) -> Result<(Vec<WorkItem>, Vec<DroppedRow>), QrForgeError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| QrForgeError::InvalidInput(format!("failed to read CSV headers: {}", e)))?
        .clone();

    let data_idx = headers
        .iter()
        .position(|h| header_matches(h, DATA_FIELD))
        .ok_or_else(|| QrForgeError::InvalidInput("CSV missing 'data' column".to_string()))?;
    let type_idx = headers.iter().position(|h| header_matches(h, TYPE_FIELD));

    let mut items = Vec::new();
    let mut dropped = Vec::new();

    for (row, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                dropped.push(DroppedRow::new(
                    row,
                    DropReason::Unreadable {
                        detail: e.to_string(),
                    },
                ));
                continue;
            }
        };

        let Some(raw) = record.get(data_idx) else {
            dropped.push(DroppedRow::new(
                row,
                DropReason::InsufficientColumns {
                    columns: record.len(),
                },
            ));
            continue;
        };

        let kind = type_idx.and_then(|idx| record.get(idx));
        match WorkItem::new(raw, kind, row) {
            Ok(item) => items.push(item),
            Err(_) => dropped.push(DroppedRow::new(row, DropReason::EmptyData)),
        }
    }

    Ok((items, dropped))
}

fn stringify(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse a JSON array of objects with a required `data` key and optional `type`.
pub fn parse_structured(bytes: &[u8]) -> Result<(Vec<WorkItem>, Vec<DroppedRow>), QrForgeError> {
    let records: Vec<serde_json::Map<String, JsonValue>> = serde_json::from_slice(bytes)
        .map_err(|e| QrForgeError::InvalidInput(format!("invalid JSON format: {}", e)))?;

    if records.is_empty() {
        return Err(QrForgeError::InvalidInput("JSON file is empty".to_string()));
    }

    let mut items = Vec::new();
    let mut dropped = Vec::new();

    for (row, record) in records.iter().enumerate() {
        let Some(raw) = record.get(DATA_FIELD) else {
            dropped.push(DroppedRow::new(row, DropReason::MissingData));
            continue;
        };

        let kind = record.get(TYPE_FIELD).map(stringify);
        match WorkItem::new(&stringify(raw), kind.as_deref(), row) {
            Ok(item) => items.push(item),
            Err(_) => dropped.push(DroppedRow::new(row, DropReason::EmptyData)),
        }
    }

    Ok((items, dropped))
}
