//! Configuration types for evtarc

use serde::{Deserialize, Serialize};

use crate::archive::FormatVersion;
use crate::{EvtarcError, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Encoder settings
    #[serde(default)]
    pub codec: CodecConfig,
    /// Decode limits
    #[serde(default)]
    pub limits: DecodeLimits,
    /// Logging settings for the binary
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Encoder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Format version stamped into written archives
    #[serde(default = "default_output_version")]
    pub output_version: i32,
}

fn default_output_version() -> i32 {
    FormatVersion::CURRENT.get()
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            output_version: default_output_version(),
        }
    }
}

impl CodecConfig {
    /// Output version as a typed value
    #[must_use]
    pub fn version(&self) -> FormatVersion {
        FormatVersion::new(self.output_version)
    }
}

/// Largest value accepted for any decode limit
pub const MAX_LIMIT: usize = i32::MAX as usize;

/// Upper bounds applied while decoding, checked before allocating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeLimits {
    /// Characters per archive string or wide string
    pub max_string_len: usize,
    /// Elements per variant array
    pub max_array_len: usize,
    /// Descriptors per event
    pub max_descriptors: usize,
    /// Records per library
    pub max_records: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_string_len: 1024 * 1024,
            max_array_len: 1024 * 1024,
            max_descriptors: 4096,
            max_records: 16 * 1024 * 1024,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EvtarcError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| EvtarcError::ConfigError(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if the output version is unsupported or a limit is zero
    /// or above [`MAX_LIMIT`]
    pub fn validate(&self) -> Result<()> {
        if self.codec.version().check_supported().is_err() {
            return Err(EvtarcError::ConfigError(format!(
                "Unsupported output_version: {}",
                self.codec.output_version
            )));
        }

        let limits = [
            ("max_string_len", self.limits.max_string_len),
            ("max_array_len", self.limits.max_array_len),
            ("max_descriptors", self.limits.max_descriptors),
            ("max_records", self.limits.max_records),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(EvtarcError::ConfigError(format!(
                    "limits.{name} must be > 0"
                )));
            }
            if value > MAX_LIMIT {
                return Err(EvtarcError::ConfigError(format!(
                    "limits.{name} must be <= {MAX_LIMIT}"
                )));
            }
        }

        if self.logging.filter.trim().is_empty() {
            return Err(EvtarcError::ConfigError(
                "logging.filter cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
