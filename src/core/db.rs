use crate::core::error;
use crate::core::pool;
use crate::core::schemas;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Open a fresh connection with WAL journaling and the given busy timeout.
pub fn db_connect_pooled(
    db_path: &str,
    busy_timeout_secs: u32,
) -> Result<Connection, error::QrForgeError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_secs(u64::from(busy_timeout_secs)))
        .map_err(error::QrForgeError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::QrForgeError::RusqliteError)?;
    Ok(conn)
}

pub fn records_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(schemas::RECORDS_DB_NAME)
}

pub fn initialize_records_db(data_dir: &Path) -> Result<PathBuf, error::QrForgeError> {
    fs::create_dir_all(data_dir).map_err(error::QrForgeError::IoError)?;
    let db_path = records_db_path(data_dir);

    pool::global_pool().with_write(&db_path, |conn| {
        for statement in schemas::records_db_statements() {
            conn.execute(statement, [])?;
        }
        Ok(())
    })?;

    tracing::debug!(db = %db_path.display(), "records database ready");
    Ok(db_path)
}
