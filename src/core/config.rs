//! Runtime configuration: defaults, `qrforge.toml`, then `QRFORGE_*` environment.

use crate::core::error::QrForgeError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_FILE_NAME: &str = "qrforge.toml";

pub const ENV_DATA_DIR: &str = "QRFORGE_DATA_DIR";
pub const ENV_OUTPUT_DIR: &str = "QRFORGE_OUTPUT_DIR";
pub const ENV_WORKERS: &str = "QRFORGE_WORKERS";
pub const ENV_SIZE: &str = "QRFORGE_SIZE";

/// QR error-correction level used for standard artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCorrection {
    Low,
    Medium,
    Quartile,
    High,
}

impl FromStr for ErrorCorrection {
    type Err = QrForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "l" => Ok(Self::Low),
            "medium" | "m" => Ok(Self::Medium),
            "quartile" | "q" => Ok(Self::Quartile),
            "high" | "h" => Ok(Self::High),
            other => Err(QrForgeError::ConfigError(format!(
                "unknown error-correction level '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Minimum edge length of the rendered PNG, in pixels.
    pub size: u32,
    pub ec_level: ErrorCorrection,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            size: 256,
            ec_level: ErrorCorrection::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Holds `records.db` and the production ledger.
    pub data_dir: PathBuf,
    /// Artifacts are written here, one file per produced item.
    pub output_dir: PathBuf,
    /// Size of the batch worker pool.
    pub workers: usize,
    pub codec: CodecConfig,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".qrforge"),
            output_dir: PathBuf::from("output"),
            workers: default_workers(),
            codec: CodecConfig::default(),
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl ForgeConfig {
    /// Apply `QRFORGE_*` overrides through `lookup` (normally `std::env::var`).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), QrForgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir.trim());
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.trim().is_empty()) {
            self.output_dir = PathBuf::from(dir.trim());
        }
        if let Some(raw) = lookup(ENV_WORKERS) {
            self.workers = parse_number(ENV_WORKERS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SIZE) {
            self.codec.size = parse_number(ENV_SIZE, &raw)?;
        }
        Ok(())
    }

    /// Anchor relative directories at `base_dir`.
    pub fn rooted_at(mut self, base_dir: &Path) -> Self {
        if self.data_dir.is_relative() {
            self.data_dir = base_dir.join(&self.data_dir);
        }
        if self.output_dir.is_relative() {
            self.output_dir = base_dir.join(&self.output_dir);
        }
        self
    }

    pub fn validate(&self) -> Result<(), QrForgeError> {
        if self.workers == 0 {
            return Err(QrForgeError::ConfigError(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.codec.size < 21 {
            return Err(QrForgeError::ConfigError(format!(
                "codec.size {} is smaller than the smallest QR symbol",
                self.codec.size
            )));
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, QrForgeError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| QrForgeError::ConfigError(format!("{} must be a number, got '{}'", key, raw)))
}

pub fn parse_config(content: &str) -> Result<ForgeConfig, QrForgeError> {
    Ok(toml::from_str(content)?)
}

/// Load configuration for a run rooted at `base_dir`.
///
/// An explicit `--config` path must exist; the implicit `qrforge.toml` is optional.
pub fn load_config(explicit: Option<&Path>, base_dir: &Path) -> Result<ForgeConfig, QrForgeError> {
    let mut config = match explicit {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|e| {
                QrForgeError::ConfigError(format!("cannot read {}: {}", path.display(), e))
            })?;
            parse_config(&content)?
        }
        None => {
            let path = base_dir.join(CONFIG_FILE_NAME);
            if path.is_file() {
                parse_config(&fs::read_to_string(&path)?)?
            } else {
                ForgeConfig::default()
            }
        }
    };

    config.apply_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config.rooted_at(base_dir))
}
