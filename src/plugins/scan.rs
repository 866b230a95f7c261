use crate::core::error::QrForgeError;
use crate::core::events::ProductionEvent;
use crate::core::records::{NewRecord, RecordStore};
use crate::pipeline::codec::{ArtifactCodec, QrPngCodec};
use crate::plugins::RunContext;
use colored::Colorize;
use std::path::{Path, PathBuf};

pub const SCANNED_KIND: &str = "scanned";

#[derive(clap::Args, Debug)]
pub struct ScanCli {
    /// Image containing a QR code.
    pub file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ScanResult {
    pub content: String,
    /// `false` when the payload was already on file.
    pub recorded: bool,
    pub artifact_path: String,
}

/// Decode `file` and make sure its payload has a record pointing somewhere.
///
/// A relative `file` is recorded rooted at the working directory, like the
/// output directory of produced artifacts.
pub fn scan_file(
    store: &dyn RecordStore,
    codec: &dyn ArtifactCodec,
    file: &Path,
) -> Result<ScanResult, QrForgeError> {
    let content = codec.decode(file)?;
    let file = std::path::absolute(file)?;
    let claim = store.find_or_insert(&NewRecord::now(&content, SCANNED_KIND, &file))?;
    Ok(ScanResult {
        content,
        recorded: claim.inserted,
        artifact_path: claim.record.artifact_path,
    })
}

pub fn run_scan_cli(ctx: &RunContext, cli: ScanCli) -> Result<(), QrForgeError> {
    let codec = QrPngCodec::from_config(&ctx.config.codec);
    let file = std::path::absolute(&cli.file)?;
    let result = scan_file(&ctx.store, &codec, &file)?;

    let mut event = ProductionEvent::new("scan", &result.content, SCANNED_KIND, 0, "scanned");
    event.artifact_path = Some(file.to_string_lossy().to_string());
    ctx.record_events(&[event]);

    ctx.emit("scan", "ok", serde_json::to_value(&result)?, || {
        println!("{} {}", "Scanned QR Content:".bright_green(), result.content);
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ErrorCorrection;
    use crate::core::records::MemoryRecordStore;
    use tempfile::tempdir;

    #[test]
    fn scan_records_unknown_payload_once() {
        let tmp = tempdir().unwrap();
        let image = tmp.path().join("in.png");
        let codec = QrPngCodec::new(128, ErrorCorrection::Medium);
        codec.encode("scan-me", &image).unwrap();
        let store = MemoryRecordStore::new();

        let first = scan_file(&store, &codec, &image).unwrap();
        let second = scan_file(&store, &codec, &image).unwrap();

        assert_eq!(first.content, "scan-me");
        assert!(first.recorded);
        assert!(!second.recorded);
        assert_eq!(store.find_by_data("scan-me").unwrap().unwrap().kind, SCANNED_KIND);
    }

    #[test]
    fn scan_of_missing_file_fails() {
        let store = MemoryRecordStore::new();
        let codec = QrPngCodec::new(128, ErrorCorrection::Medium);
        assert!(scan_file(&store, &codec, Path::new("/nope/missing.png")).is_err());
        assert!(store.is_empty());
    }
}
