//! Configuration management (datagen.toml).
//!
//! Values are resolved in this order: explicit `--config` path, `./datagen.toml`,
//! `$XDG_CONFIG_HOME/datagen/datagen.toml`, then built-in defaults. The CLI
//! applies its flags on top of whatever was loaded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ConfigError, Result};
use crate::logging::LogConfig;
use crate::partition::PartitionParams;
use crate::record::{ByteOrder, RECORD_WIDTH};

/// Config file name looked up in the working directory and config dir.
pub const CONFIG_FILE_NAME: &str = "datagen.toml";

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;
const TIB: u64 = 1024 * GIB;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown log format: {s}. Expected pretty or json")),
        }
    }
}

/// What the reader does with a trailing partial record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncationPolicy {
    /// Fail with `Error::TruncatedRecord`
    #[default]
    Error,
    /// Drop the partial tail and keep the whole records
    Ignore,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub generate: GenerateConfig,
    pub read: ReadConfig,
    pub logging: LogConfig,
}

/// Settings for the `generate` and `plan` commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Directory the data files are written to (created if absent)
    pub output_dir: PathBuf,
    /// Sum of all file sizes in bytes
    pub total_size: u64,
    /// Number of files to write
    pub file_count: usize,
    /// Starting size of every file in bytes
    pub base_size: u64,
    /// Largest single growth step in bytes
    pub increment_cap: u64,
    /// Upper bound on water-filling passes
    pub max_passes: u64,
    /// File name prefix; files are `<prefix><index>.bin`
    pub file_prefix: String,
    /// Index of the first file
    pub first_index: u64,
    /// When set, every file gets exactly this size and no partitioning runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uniform_size: Option<u64>,
    /// RNG seed; unset means seeded from the OS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub byte_order: ByteOrder,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./data"),
            total_size: 100 * MIB,
            file_count: 100,
            base_size: 16 * KIB,
            increment_cap: 2 * MIB,
            max_passes: 1_000_000,
            file_prefix: "data_file_".to_string(),
            first_index: 1,
            uniform_size: None,
            seed: None,
            byte_order: ByteOrder::Native,
        }
    }
}

impl GenerateConfig {
    /// Partitioner inputs derived from this config.
    #[must_use]
    pub fn partition_params(&self) -> PartitionParams {
        PartitionParams {
            target_total: self.total_size,
            file_count: self.file_count,
            base_size: self.base_size,
            increment_cap: self.increment_cap,
            max_passes: self.max_passes,
        }
    }

    /// File name for the `position`-th entry of a plan.
    #[must_use]
    pub fn file_name(&self, position: usize) -> String {
        format!("{}{}.bin", self.file_prefix, self.first_index + position as u64)
    }

    /// Reject combinations that cannot produce a plan.
    pub fn validate(&self) -> Result<()> {
        if self.file_count == 0 {
            return Err(invalid("file_count must be at least 1"));
        }
        if self.file_prefix.contains(['/', '\\']) {
            return Err(invalid("file_prefix must not contain path separators"));
        }
        if self
            .first_index
            .checked_add(self.file_count as u64 - 1)
            .is_none()
        {
            return Err(invalid(format!(
                "first_index {} leaves no room for {} file names",
                self.first_index, self.file_count
            )));
        }
        if let Some(size) = self.uniform_size {
            if size % RECORD_WIDTH != 0 {
                return Err(invalid(format!(
                    "uniform_size {size} is not a multiple of {RECORD_WIDTH}"
                )));
            }
            return Ok(());
        }
        self.partition_params().validate()
    }
}

/// Settings for the `show` and `inspect` commands
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadConfig {
    pub truncation: TruncationPolicy,
    pub byte_order: ByteOrder,
}

impl Config {
    /// Load configuration using the standard resolution order.
    ///
    /// An explicit path must exist; implicit locations are optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.display().to_string()).into());
            }
            return Self::from_file(path);
        }

        match resolve_config_path(None) {
            Some(path) => Self::from_file(&path),
            None => {
                tracing::debug!("No config file found; using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.display().to_string(), e.to_string()))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(config_path = %path.display(), "Loaded config file");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()).into())
    }
}

/// Find the config file to load, if any.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    let user = dirs::config_dir()?.join("datagen").join(CONFIG_FILE_NAME);
    user.is_file().then_some(user)
}

/// Parse a byte count such as `4096`, `64K`, `16KiB`, `2MiB` or `4GiB`.
///
/// Suffixes are binary (powers of 1024) and case-insensitive.
pub fn parse_byte_size(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '_')
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split);
    let digits: String = digits.chars().filter(|c| *c != '_').collect();

    if digits.is_empty() {
        return Err(size_error(input, "missing number"));
    }
    let value: u64 = digits
        .parse()
        .map_err(|e: std::num::ParseIntError| size_error(input, &e.to_string()))?;

    let multiplier = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => KIB,
        "m" | "mb" | "mib" => MIB,
        "g" | "gb" | "gib" => GIB,
        "t" | "tb" | "tib" => TIB,
        other => return Err(size_error(input, &format!("unknown suffix {other:?}"))),
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| size_error(input, "value overflows u64"))
}

fn size_error(input: &str, reason: &str) -> crate::Error {
    ConfigError::InvalidSize(input.to_string(), reason.to_string()).into()
}

fn invalid(msg: impl Into<String>) -> crate::Error {
    ConfigError::ValidationError(msg.into()).into()
}
