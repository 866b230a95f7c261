//! Deduplicating producer: one work item in, one [`Outcome`] out.
//!
//! Store hit means skip. On a miss the artifact is encoded to a fresh path and
//! claimed with [`RecordStore::find_or_insert`]; if another producer claimed
//! the same data first (the record points elsewhere), our file is removed and
//! the winner's path returned.
//! Errors never escape as `Err`: they become [`Outcome::Failed`] so sibling
//! items keep going.

use crate::core::events::ProductionEvent;
use crate::core::records::{NewRecord, RecordStore};
use crate::core::workspace::{ArtifactPrefix, Workspace};
use crate::pipeline::codec::ArtifactCodec;
use crate::pipeline::input::WorkItem;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Lookup,
    Encode,
    Persist,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureStage::Lookup => "lookup",
            FailureStage::Encode => "encode",
            FailureStage::Persist => "persist",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Produced {
        artifact_path: PathBuf,
    },
    Skipped {
        artifact_path: PathBuf,
    },
    Failed {
        stage: FailureStage,
        reason: String,
        /// Artifact written before persistence failed; left on disk unrecorded.
        orphan: Option<PathBuf>,
    },
}

impl Outcome {
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Produced { .. } => "produced",
            Outcome::Skipped { .. } => "skipped",
            Outcome::Failed { .. } => "failed",
        }
    }

    /// Produced and skipped both satisfy the request.
    pub fn is_processed(&self) -> bool {
        !matches!(self, Outcome::Failed { .. })
    }

    pub fn artifact_path(&self) -> Option<&PathBuf> {
        match self {
            Outcome::Produced { artifact_path } | Outcome::Skipped { artifact_path } => {
                Some(artifact_path)
            }
            Outcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    pub item: WorkItem,
    pub outcome: Outcome,
}

impl ItemOutcome {
    pub fn to_event(&self, op: &str) -> ProductionEvent {
        let mut event = ProductionEvent::new(
            op,
            &self.item.data,
            &self.item.kind,
            self.item.row,
            self.outcome.status(),
        );
        match &self.outcome {
            Outcome::Produced { artifact_path } | Outcome::Skipped { artifact_path } => {
                event.artifact_path = Some(artifact_path.to_string_lossy().to_string());
            }
            Outcome::Failed {
                stage,
                reason,
                orphan,
            } => {
                event.reason = Some(format!("{}: {}", stage, reason));
                event.artifact_path = orphan.as_ref().map(|p| p.to_string_lossy().to_string());
            }
        }
        event
    }
}

pub struct Producer<'a> {
    store: &'a dyn RecordStore,
    codec: &'a dyn ArtifactCodec,
    workspace: &'a Workspace,
    prefix: ArtifactPrefix,
}

impl<'a> Producer<'a> {
    pub fn new(
        store: &'a dyn RecordStore,
        codec: &'a dyn ArtifactCodec,
        workspace: &'a Workspace,
    ) -> Self {
        Self {
            store,
            codec,
            workspace,
            prefix: ArtifactPrefix::Standard,
        }
    }

    pub fn with_prefix(mut self, prefix: ArtifactPrefix) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn produce_item(&self, item: WorkItem) -> ItemOutcome {
        let outcome = self.produce(&item);
        ItemOutcome { item, outcome }
    }

    pub fn produce(&self, item: &WorkItem) -> Outcome {
        match self.store.find_by_data(&item.data) {
            Ok(Some(existing)) => {
                info!(data = %item.data, path = %existing.artifact_path, "found in store");
                return Outcome::Skipped {
                    artifact_path: PathBuf::from(existing.artifact_path),
                };
            }
            Ok(None) => debug!(data = %item.data, "store miss"),
            Err(e) => {
                warn!(data = %item.data, error = %e, "record lookup failed");
                return Outcome::Failed {
                    stage: FailureStage::Lookup,
                    reason: e.to_string(),
                    orphan: None,
                };
            }
        }

        let artifact_path = self.workspace.fresh_artifact_path(self.prefix);
        if let Err(e) = self.codec.encode(&item.data, &artifact_path) {
            warn!(data = %item.data, error = %e, "failed to generate QR");
            return Outcome::Failed {
                stage: FailureStage::Encode,
                reason: e.to_string(),
                orphan: None,
            };
        }

        let record = NewRecord::now(&item.data, &item.kind, &artifact_path);
        match self.store.find_or_insert(&record) {
            // A replayed claim can report our own record as pre-existing.
            Ok(claim)
                if claim.inserted || Path::new(&claim.record.artifact_path) == artifact_path =>
            {
                info!(data = %item.data, path = %artifact_path.display(), "generated QR");
                Outcome::Produced { artifact_path }
            }
            Ok(claim) => {
                // Lost the race to a concurrent producer of the same data.
                if let Err(e) = fs::remove_file(&artifact_path) {
                    warn!(path = %artifact_path.display(), error = %e, "could not remove duplicate artifact");
                }
                info!(data = %item.data, path = %claim.record.artifact_path, "found in store");
                Outcome::Skipped {
                    artifact_path: PathBuf::from(claim.record.artifact_path),
                }
            }
            Err(e) => {
                warn!(
                    data = %item.data,
                    orphan = %artifact_path.display(),
                    error = %e,
                    "failed to record QR, artifact left unrecorded"
                );
                Outcome::Failed {
                    stage: FailureStage::Persist,
                    reason: e.to_string(),
                    orphan: Some(artifact_path),
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::error::QrForgeError;
    use crate::core::records::{Claim, MemoryRecordStore, ProductionRecord};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::{TempDir, tempdir};

    /// Writes the payload as plain bytes; fails for payloads starting with `fail`.
    #[derive(Default)]
    pub(crate) struct FakeCodec {
        pub encodes: AtomicUsize,
    }

    impl ArtifactCodec for FakeCodec {
        fn encode(&self, data: &str, dest: &Path) -> Result<(), QrForgeError> {
            self.encodes.fetch_add(1, Ordering::SeqCst);
            if data.starts_with("fail") {
                return Err(QrForgeError::CodecError("payload rejected".into()));
            }
            fs::write(dest, data)?;
            Ok(())
        }

        fn decode(&self, src: &Path) -> Result<String, QrForgeError> {
            Ok(fs::read_to_string(src)?)
        }
    }

    /// Lookups miss, writes fail.
    struct BrokenStore;

    impl RecordStore for BrokenStore {
        fn find_by_data(&self, _data: &str) -> Result<Option<ProductionRecord>, QrForgeError> {
            Ok(None)
        }
        fn insert(&self, _record: &NewRecord) -> Result<i64, QrForgeError> {
            Err(QrForgeError::StoreError("disk full".into()))
        }
        fn find_or_insert(&self, _record: &NewRecord) -> Result<Claim, QrForgeError> {
            Err(QrForgeError::StoreError("disk full".into()))
        }
        fn list_recent(&self, _limit: usize) -> Result<Vec<ProductionRecord>, QrForgeError> {
            Ok(Vec::new())
        }
    }

    /// Lookup always misses even though a record exists: simulates losing the
    /// check-then-act race to another producer.
    struct RacingStore {
        inner: MemoryRecordStore,
    }

    impl RecordStore for RacingStore {
        fn find_by_data(&self, _data: &str) -> Result<Option<ProductionRecord>, QrForgeError> {
            Ok(None)
        }
        fn insert(&self, record: &NewRecord) -> Result<i64, QrForgeError> {
            self.inner.insert(record)
        }
        fn find_or_insert(&self, record: &NewRecord) -> Result<Claim, QrForgeError> {
            self.inner.find_or_insert(record)
        }
        fn list_recent(&self, limit: usize) -> Result<Vec<ProductionRecord>, QrForgeError> {
            self.inner.list_recent(limit)
        }
    }

    /// Every call fails, lookups included.
    struct UnreachableStore;

    impl RecordStore for UnreachableStore {
        fn find_by_data(&self, _data: &str) -> Result<Option<ProductionRecord>, QrForgeError> {
            Err(QrForgeError::StoreError("database is locked".into()))
        }
        fn insert(&self, _record: &NewRecord) -> Result<i64, QrForgeError> {
            Err(QrForgeError::StoreError("database is locked".into()))
        }
        fn find_or_insert(&self, _record: &NewRecord) -> Result<Claim, QrForgeError> {
            Err(QrForgeError::StoreError("database is locked".into()))
        }
        fn list_recent(&self, _limit: usize) -> Result<Vec<ProductionRecord>, QrForgeError> {
            Err(QrForgeError::StoreError("database is locked".into()))
        }
    }

    /// Stores the claim but reports it as pre-existing, as a claim replayed
    /// after its first attempt already committed would.
    struct ReplayedClaimStore {
        inner: MemoryRecordStore,
    }

    impl RecordStore for ReplayedClaimStore {
        fn find_by_data(&self, data: &str) -> Result<Option<ProductionRecord>, QrForgeError> {
            self.inner.find_by_data(data)
        }
        fn insert(&self, record: &NewRecord) -> Result<i64, QrForgeError> {
            self.inner.insert(record)
        }
        fn find_or_insert(&self, record: &NewRecord) -> Result<Claim, QrForgeError> {
            let claim = self.inner.find_or_insert(record)?;
            Ok(Claim {
                inserted: false,
                record: claim.record,
            })
        }
        fn list_recent(&self, limit: usize) -> Result<Vec<ProductionRecord>, QrForgeError> {
            self.inner.list_recent(limit)
        }
    }

    pub(crate) fn workspace() -> (TempDir, Workspace) {
        let tmp = tempdir().unwrap();
        let ws = Workspace::new(tmp.path().join("data"), tmp.path().join("output"));
        ws.ensure_output_dir().unwrap();
        (tmp, ws)
    }

    fn artifact_count(ws: &Workspace) -> usize {
        fs::read_dir(&ws.output_dir).unwrap().count()
    }

    fn item(data: &str, kind: &str) -> WorkItem {
        WorkItem::new(data, Some(kind), 0).unwrap()
    }

    #[test]
    fn miss_produces_one_artifact_and_one_record() {
        let (_tmp, ws) = workspace();
        let store = MemoryRecordStore::new();
        let codec = FakeCodec::default();
        let producer = Producer::new(&store, &codec, &ws);

        let outcome = producer.produce(&item("abc", "custom"));
        let Outcome::Produced { artifact_path } = &outcome else {
            panic!("expected produced, got {outcome:?}");
        };
        assert!(artifact_path.exists());
        assert_eq!(artifact_count(&ws), 1);

        let record = store.find_by_data("abc").unwrap().unwrap();
        assert_eq!(record.kind, "custom");
        assert_eq!(PathBuf::from(record.artifact_path), *artifact_path);
    }

    #[test]
    fn second_run_skips_with_same_path() {
        let (_tmp, ws) = workspace();
        let store = MemoryRecordStore::new();
        let codec = FakeCodec::default();
        let producer = Producer::new(&store, &codec, &ws);

        let first = producer.produce(&item("abc", "standard"));
        let second = producer.produce(&item("abc", "standard"));

        assert_eq!(first.status(), "produced");
        assert_eq!(second.status(), "skipped");
        assert_eq!(first.artifact_path(), second.artifact_path());
        assert_eq!(codec.encodes.load(Ordering::SeqCst), 1);
        assert_eq!(artifact_count(&ws), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn codec_failure_inserts_nothing() {
        let (_tmp, ws) = workspace();
        let store = MemoryRecordStore::new();
        let codec = FakeCodec::default();

        let outcome = Producer::new(&store, &codec, &ws).produce(&item("fail-me", "standard"));
        assert!(matches!(
            outcome,
            Outcome::Failed {
                stage: FailureStage::Encode,
                orphan: None,
                ..
            }
        ));
        assert!(store.is_empty());
        assert_eq!(artifact_count(&ws), 0);
    }

    #[test]
    fn persist_failure_reports_orphaned_artifact() {
        let (_tmp, ws) = workspace();
        let codec = FakeCodec::default();

        let outcome = Producer::new(&BrokenStore, &codec, &ws).produce(&item("abc", "standard"));
        let Outcome::Failed {
            stage,
            reason,
            orphan,
        } = outcome
        else {
            panic!("expected failure");
        };
        assert_eq!(stage, FailureStage::Persist);
        assert!(reason.contains("disk full"));
        assert!(orphan.unwrap().exists());
    }

    #[test]
    fn losing_the_race_removes_own_artifact_and_returns_winner() {
        let (_tmp, ws) = workspace();
        let store = RacingStore {
            inner: MemoryRecordStore::new(),
        };
        store
            .insert(&NewRecord::now("abc", "standard", Path::new("winner.png")))
            .unwrap();
        let codec = FakeCodec::default();

        let outcome = Producer::new(&store, &codec, &ws).produce(&item("abc", "standard"));
        assert_eq!(
            outcome,
            Outcome::Skipped {
                artifact_path: PathBuf::from("winner.png")
            }
        );
        assert_eq!(artifact_count(&ws), 0);
        assert_eq!(store.inner.len(), 1);
    }

    #[test]
    fn custom_prefix_names_artifact() {
        let (_tmp, ws) = workspace();
        let store = MemoryRecordStore::new();
        let codec = FakeCodec::default();
        let outcome = Producer::new(&store, &codec, &ws)
            .with_prefix(ArtifactPrefix::Custom)
            .produce(&item("abc", "custom"));
        let name = outcome
            .artifact_path()
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string();
        assert!(name.starts_with("custom_qr_"));
    }

    #[test]
    fn failed_outcome_event_carries_stage_and_orphan() {
        let outcome = ItemOutcome {
            item: item("abc", "standard"),
            outcome: Outcome::Failed {
                stage: FailureStage::Persist,
                reason: "disk full".into(),
                orphan: Some(PathBuf::from("output/qr_x.png")),
            },
        };
        let event = outcome.to_event("batch");
        assert_eq!(event.status, "failed");
        assert_eq!(event.reason.as_deref(), Some("persist: disk full"));
        assert_eq!(event.artifact_path.as_deref(), Some("output/qr_x.png"));
    }

    #[test]
    fn lookup_failure_fails_before_encoding() {
        let (_tmp, ws) = workspace();
        let codec = FakeCodec::default();

        let outcome =
            Producer::new(&UnreachableStore, &codec, &ws).produce(&item("abc", "standard"));
        let Outcome::Failed {
            stage,
            reason,
            orphan,
        } = outcome
        else {
            panic!("expected failure");
        };
        assert_eq!(stage, FailureStage::Lookup);
        assert!(reason.contains("database is locked"));
        assert_eq!(orphan, None);
        assert_eq!(codec.encodes.load(Ordering::SeqCst), 0);
        assert_eq!(artifact_count(&ws), 0);
    }

    #[test]
    fn claim_pointing_at_own_artifact_counts_as_produced() {
        let (_tmp, ws) = workspace();
        let store = ReplayedClaimStore {
            inner: MemoryRecordStore::new(),
        };
        let codec = FakeCodec::default();

        let outcome = Producer::new(&store, &codec, &ws).produce(&item("abc", "standard"));
        let Outcome::Produced { artifact_path } = &outcome else {
            panic!("expected produced, got {outcome:?}");
        };
        assert!(artifact_path.exists());
        let record = store.find_by_data("abc").unwrap().unwrap();
        assert_eq!(PathBuf::from(record.artifact_path), *artifact_path);
        assert_eq!(artifact_count(&ws), 1);
    }
}
