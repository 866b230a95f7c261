//! On-disk layout of a qrforge run: the data directory (records database,
//! production ledger) and the artifact output directory.

use crate::core::config::ForgeConfig;
use crate::core::error::QrForgeError;
use crate::core::schemas;
use crate::core::time::artifact_token;
use std::fs;
use std::path::{Path, PathBuf};

/// Filename prefix for artifacts, one per generator flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactPrefix {
    Standard,
    Custom,
}

impl ArtifactPrefix {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactPrefix::Standard => "qr",
            ArtifactPrefix::Custom => "custom_qr",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Workspace {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Workspace {
    pub fn new(data_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(config: &ForgeConfig) -> Self {
        Self::new(&config.data_dir, &config.output_dir)
    }

    pub fn events_path(&self) -> PathBuf {
        self.data_dir.join(schemas::PRODUCTION_EVENTS_LOG_NAME)
    }

    pub fn ensure_output_dir(&self) -> Result<&Path, QrForgeError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            QrForgeError::IoError(std::io::Error::new(
                e.kind(),
                format!(
                    "failed to create output directory {}: {}",
                    self.output_dir.display(),
                    e
                ),
            ))
        })?;
        Ok(&self.output_dir)
    }

    /// A fresh path in the output directory. Built from a random token, so
    /// concurrent producers never target the same file.
    pub fn fresh_artifact_path(&self, prefix: ArtifactPrefix) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.png", prefix.as_str(), artifact_token()))
    }
}
