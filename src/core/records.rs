//! Production records: the persistent payload -> artifact mapping.
//!
//! [`RecordStore`] is the seam the producer depends on. The SQLite store backs
//! the CLI; [`MemoryRecordStore`] serves tests and embedders that do not want
//! a database file.

use crate::core::db;
use crate::core::error::QrForgeError;
use crate::core::pool;
use crate::core::time::now_epoch_z;
use rusqlite::{OptionalExtension, TransactionBehavior, params};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub id: i64,
    pub data: String,
    pub kind: String,
    pub artifact_path: String,
    pub created_at: String,
}

/// A record not yet persisted; the store assigns `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub data: String,
    pub kind: String,
    pub artifact_path: String,
    pub created_at: String,
}

impl NewRecord {
    pub fn now(data: &str, kind: &str, artifact_path: &Path) -> Self {
        Self {
            data: data.to_string(),
            kind: kind.to_string(),
            artifact_path: artifact_path.to_string_lossy().to_string(),
            created_at: now_epoch_z(),
        }
    }
}

/// Result of [`RecordStore::find_or_insert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    /// `false` when a record for the same data already existed.
    pub inserted: bool,
    pub record: ProductionRecord,
}

pub trait RecordStore: Send + Sync {
    fn find_by_data(&self, data: &str) -> Result<Option<ProductionRecord>, QrForgeError>;

    /// Plain insert. Fails if a record with the same data exists.
    fn insert(&self, record: &NewRecord) -> Result<i64, QrForgeError>;

    /// Insert `record` unless one with the same data exists, as one atomic step.
    fn find_or_insert(&self, record: &NewRecord) -> Result<Claim, QrForgeError>;

    /// Most recent records first.
    fn list_recent(&self, limit: usize) -> Result<Vec<ProductionRecord>, QrForgeError>;
}

pub struct SqliteRecordStore {
    db_path: PathBuf,
}

impl SqliteRecordStore {
    /// Open (creating and migrating if needed) `records.db` under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, QrForgeError> {
        let db_path = db::initialize_records_db(data_dir)?;
        Ok(Self { db_path })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, data, kind, artifact_path, created_at FROM production_records";

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProductionRecord> {
    Ok(ProductionRecord {
        id: row.get(0)?,
        data: row.get(1)?,
        kind: row.get(2)?,
        artifact_path: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn select_by_data(
    conn: &rusqlite::Connection,
    data: &str,
) -> Result<Option<ProductionRecord>, QrForgeError> {
    let sql = format!("{} WHERE data = ?1", SELECT_COLUMNS);
    Ok(conn
        .query_row(&sql, params![data], record_from_row)
        .optional()?)
}

impl RecordStore for SqliteRecordStore {
    fn find_by_data(&self, data: &str) -> Result<Option<ProductionRecord>, QrForgeError> {
        pool::global_pool().with_read(&self.db_path, |conn| select_by_data(conn, data))
    }

    fn insert(&self, record: &NewRecord) -> Result<i64, QrForgeError> {
        pool::global_pool().with_write(&self.db_path, |conn| {
            conn.execute(
                "INSERT INTO production_records(data, kind, artifact_path, created_at)
                 VALUES(?1, ?2, ?3, ?4)",
                params![
                    record.data,
                    record.kind,
                    record.artifact_path,
                    record.created_at
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn find_or_insert(&self, record: &NewRecord) -> Result<Claim, QrForgeError> {
        // Insert and re-select commit together, so a busy retry replays both.
        pool::global_pool().with_write(&self.db_path, |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let changed = tx.execute(
                "INSERT INTO production_records(data, kind, artifact_path, created_at)
                 VALUES(?1, ?2, ?3, ?4)
                 ON CONFLICT(data) DO NOTHING",
                params![
                    record.data,
                    record.kind,
                    record.artifact_path,
                    record.created_at
                ],
            )?;
            let stored = select_by_data(&tx, &record.data)?.ok_or_else(|| {
                QrForgeError::StoreError(format!(
                    "record for '{}' vanished after insert",
                    record.data
                ))
            })?;
            tx.commit()?;
            Ok(Claim {
                inserted: changed == 1,
                record: stored,
            })
        })
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<ProductionRecord>, QrForgeError> {
        pool::global_pool().with_read(&self.db_path, |conn| {
            let sql = format!("{} ORDER BY id DESC LIMIT ?1", SELECT_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let rows = stmt.query_map(params![limit], record_from_row)?;

            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })
    }
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    by_data: FxHashMap<String, ProductionRecord>,
}

impl MemoryState {
    fn push(&mut self, record: &NewRecord) -> ProductionRecord {
        self.next_id += 1;
        let stored = ProductionRecord {
            id: self.next_id,
            data: record.data.clone(),
            kind: record.kind.clone(),
            artifact_path: record.artifact_path.clone(),
            created_at: record.created_at.clone(),
        };
        self.by_data.insert(stored.data.clone(), stored.clone());
        stored
    }
}

/// Process-local store with the same uniqueness rules as the SQLite one.
#[derive(Default)]
pub struct MemoryRecordStore {
    state: Mutex<MemoryState>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.by_data.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, QrForgeError> {
        self.state
            .lock()
            .map_err(|_| QrForgeError::StoreError("memory store lock poisoned".to_string()))
    }
}

impl RecordStore for MemoryRecordStore {
    fn find_by_data(&self, data: &str) -> Result<Option<ProductionRecord>, QrForgeError> {
        Ok(self.lock()?.by_data.get(data).cloned())
    }

    fn insert(&self, record: &NewRecord) -> Result<i64, QrForgeError> {
        let mut state = self.lock()?;
        if state.by_data.contains_key(&record.data) {
            return Err(QrForgeError::StoreError(format!(
                "duplicate record for '{}'",
                record.data
            )));
        }
        Ok(state.push(record).id)
    }

    fn find_or_insert(&self, record: &NewRecord) -> Result<Claim, QrForgeError> {
        let mut state = self.lock()?;
        if let Some(existing) = state.by_data.get(&record.data) {
            return Ok(Claim {
                inserted: false,
                record: existing.clone(),
            });
        }
        Ok(Claim {
            inserted: true,
            record: state.push(record),
        })
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<ProductionRecord>, QrForgeError> {
        let state = self.lock()?;
        let mut records: Vec<ProductionRecord> = state.by_data.values().cloned().collect();
        records.sort_by(|a, b| b.id.cmp(&a.id));
        records.truncate(limit);
        Ok(records)
    }
}
