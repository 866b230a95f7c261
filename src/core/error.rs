use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QrForgeError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Worker pool error: {0}")]
    WorkerPoolError(#[from] rayon::ThreadPoolBuildError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Codec error: {0}")]
    CodecError(String),
    #[error("Store error: {0}")]
    StoreError(String),
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl QrForgeError {
    /// Structural input problems abort the whole run before any work starts.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, QrForgeError::InvalidInput(_))
    }
}
