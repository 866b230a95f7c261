//! SQLite connection access with read/write separation and busy retries.
//!
//! - Writes take a per-database mutex, so producers on the batch pool queue up
//!   for the single SQLite writer instead of hammering `SQLITE_BUSY`.
//! - Reads open a fresh connection without the mutex (WAL allows concurrent readers).
//!
//! Connections are opened per operation rather than cached: a batch run is
//! short-lived and the per-thread cost is dwarfed by PNG encoding.

use crate::core::db;
use crate::core::error::QrForgeError;
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::Duration;

/// Maximum retry attempts for busy/locked errors.
const MAX_RETRIES: u32 = 5;
/// Base delay for exponential backoff (milliseconds).
const BASE_DELAY_MS: u64 = 50;
/// Maximum delay cap (milliseconds).
const MAX_DELAY_MS: u64 = 2_000;

const WRITE_BUSY_TIMEOUT_SECS: u32 = 10;
const READ_BUSY_TIMEOUT_SECS: u32 = 5;

struct PoolEntry {
    write_lock: Mutex<()>,
    db_path: PathBuf,
}

/// Per-database write serialization plus lock-free reads.
pub struct SqlitePool {
    entries: Mutex<HashMap<PathBuf, &'static PoolEntry>>,
}

impl SqlitePool {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get_entry(&self, db_path: &Path) -> Result<&'static PoolEntry, QrForgeError> {
        let key = db_path.to_path_buf();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| QrForgeError::StoreError("pool entries lock poisoned".to_string()))?;
        if let Some(entry) = entries.get(&key) {
            return Ok(*entry);
        }
        // Entries live for the whole process; a CLI run touches one or two databases.
        let entry = Box::leak(Box::new(PoolEntry {
            write_lock: Mutex::new(()),
            db_path: key.clone(),
        }));
        entries.insert(key, entry);
        Ok(entry)
    }

    /// Run `f` on a write connection, serialized per database and retried
    /// with backoff while SQLite reports the database busy or locked.
    pub fn with_write<F, R>(&self, db_path: &Path, mut f: F) -> Result<R, QrForgeError>
    where
        F: FnMut(&mut Connection) -> Result<R, QrForgeError>,
    {
        let entry = self.get_entry(db_path)?;
        let _guard = entry
            .write_lock
            .lock()
            .map_err(|_| QrForgeError::StoreError("pool write lock poisoned".to_string()))?;

        retry_on_busy(|| {
            let mut conn =
                db::db_connect_pooled(&entry.db_path.to_string_lossy(), WRITE_BUSY_TIMEOUT_SECS)?;
            f(&mut conn)
        })
    }

    /// Run `f` on a fresh read connection (no mutex).
    pub fn with_read<F, R>(&self, db_path: &Path, f: F) -> Result<R, QrForgeError>
    where
        F: FnOnce(&Connection) -> Result<R, QrForgeError>,
    {
        let conn = db::db_connect_pooled(&db_path.to_string_lossy(), READ_BUSY_TIMEOUT_SECS)?;
        f(&conn)
    }
}

fn retry_on_busy<F, R>(mut f: F) -> Result<R, QrForgeError>
where
    F: FnMut() -> Result<R, QrForgeError>,
{
    let mut attempt = 0u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) if is_busy_error(&e) && attempt < MAX_RETRIES => {
                attempt += 1;
                let delay_ms = (BASE_DELAY_MS * 2u64.pow(attempt - 1)).min(MAX_DELAY_MS);
                tracing::debug!(attempt, delay_ms, "sqlite busy, backing off");
                thread::sleep(Duration::from_millis(delay_ms));
            }
            Err(e) => return Err(e),
        }
    }
}

fn is_busy_error(err: &QrForgeError) -> bool {
    match err {
        QrForgeError::RusqliteError(rusqlite::Error::SqliteFailure(code, _)) => matches!(
            code.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}

/// Global pool instance (same lifetime as the process).
pub fn global_pool() -> &'static SqlitePool {
    static POOL: OnceLock<SqlitePool> = OnceLock::new();
    POOL.get_or_init(SqlitePool::new)
}
