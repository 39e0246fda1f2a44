//! # Configuration Management
//!
//! Handles all configuration for FaceMatch components. Every section has a
//! `Default`, so a TOML file only needs the keys it overrides:
//!
//! ```toml
//! [search]
//! default_threshold = 0.55
//! timeout = { secs = 2, nanos = 0 }
//!
//! [api]
//! port = 8080
//!
//! [monitoring.logging]
//! level = "debug"
//! format = "json"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ResultExt};

/// Threshold calibrated for the upstream 128-d face-recognition model.
/// A different embedding model needs a different value.
pub const DEFAULT_THRESHOLD: f32 = 0.6;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub ingestion: IngestionConfig,
    pub api: ApiConfig,
    pub monitoring: MonitoringConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(Error::from)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text)
    }

    /// Parse configuration from TOML text and validate it
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|e| Error::Configuration {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<()> {
        let threshold = self.search.default_threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(Error::Configuration {
                message: format!("search.default_threshold must be within [0, 1], got {threshold}"),
            });
        }
        if self.search.default_max_results == Some(0) {
            return Err(Error::Configuration {
                message: "search.default_max_results must be positive when set".to_string(),
            });
        }
        if self.search.timeout.is_zero() {
            return Err(Error::Configuration {
                message: "search.timeout must be non-zero".to_string(),
            });
        }
        if self.ingestion.max_photos_per_batch == 0 || self.ingestion.max_faces_per_photo == 0 {
            return Err(Error::Configuration {
                message: "ingestion limits must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Distance cutoff used when the caller does not send one
    pub default_threshold: f32,
    /// Result cap used when the caller does not send one (None = unbounded)
    pub default_max_results: Option<usize>,
    /// Index size (in faces) from which the scan runs on the rayon pool
    pub parallel_threshold: usize,
    /// Upper bound on one search at the service boundary
    pub timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_threshold: DEFAULT_THRESHOLD,
            default_max_results: None,
            parallel_threshold: 4096,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub max_photos_per_batch: usize,
    /// Descriptors beyond this slot count are rejected per face
    pub max_faces_per_photo: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_photos_per_batch: 10_000,
            max_faces_per_photo: 64,
        }
    }
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub max_request_size: usize,
    /// Catalog file loaded into the registry at startup
    pub catalog: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_request_size: 64 * 1024 * 1024, // 64MB
            catalog: None,
        }
    }
}

/// Monitoring configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Text,
        }
    }
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}
