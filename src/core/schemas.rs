//! Database schema definitions for the qrforge record store.
//!
//! A single SQLite database (`records.db`) lives in the data directory and
//! holds one row per distinct payload that has ever been turned into an
//! artifact (or scanned back out of one).

pub const RECORDS_DB_NAME: &str = "records.db";

pub const PRODUCTION_EVENTS_LOG_NAME: &str = "production.events.jsonl";

pub const RECORDS_DB_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS production_records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        data TEXT NOT NULL,
        kind TEXT NOT NULL,
        artifact_path TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
";

/// Uniqueness on `data` is what makes find-or-insert atomic across threads
/// and processes.
pub const RECORDS_DB_SCHEMA_DATA_INDEX: &str = "
    CREATE UNIQUE INDEX IF NOT EXISTS idx_production_records_data
    ON production_records(data)
";

pub const RECORDS_DB_SCHEMA_CREATED_INDEX: &str = "
    CREATE INDEX IF NOT EXISTS idx_production_records_created_at
    ON production_records(created_at)
";

pub fn records_db_statements() -> [&'static str; 3] {
    [
        RECORDS_DB_SCHEMA,
        RECORDS_DB_SCHEMA_DATA_INDEX,
        RECORDS_DB_SCHEMA_CREATED_INDEX,
    ]
}
