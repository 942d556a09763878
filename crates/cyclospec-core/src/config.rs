//! # Configuration System
//!
//! YAML configuration for applications built on cyclospec:
//!
//! - FAM / SCD estimator parameters
//! - Cyclic-lag (CCSD) estimator parameters
//! - Logging
//!
//! Every section is optional; missing fields take their defaults.
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `CYCLOSPEC_CONFIG` environment variable
//! 2. `./cyclospec.yaml` (current directory)
//! 3. `~/.config/cyclospec/config.yaml` (user config, platform dependent)
//! 4. `/etc/cyclospec/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! scd:
//!   window_size: 128
//!   step: 32
//!   mode: fam_full
//!
//! ccsd:
//!   window_size: 256
//!   step: 256
//!   sigma: 0.5
//!   kernel: tanh_product
//!   boundary: wrap_to_next_block
//!
//! logging:
//!   level: debug
//!   format: json
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ccsd::{CcsdConfig, CcsdEstimator, Kernel};
use crate::fam::{FamEstimator, ScdConfig, ScdMode};
use crate::observe::LogConfig;
use crate::types::CycloResult;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "CYCLOSPEC_CONFIG";

/// Error type for configuration operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("config not found: {0}")]
    NotFound(String),
    #[error("failed to read config: {0}")]
    ReadError(String),
    #[error("failed to parse config: {0}")]
    ParseError(String),
    #[error("invalid config: {0}")]
    ValidationError(String),
}

/// Complete cyclospec configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CyclospecConfig {
    /// Configuration format version
    pub version: String,
    /// FAM estimator and `batch_scd` parameters
    pub scd: ScdConfig,
    /// Cyclic-lag estimator and `batch_ccsd` parameters
    pub ccsd: CcsdConfig,
    pub logging: LogConfig,
}

impl Default for CyclospecConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            scd: ScdConfig::default(),
            ccsd: CcsdConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl CyclospecConfig {
    /// Load configuration from the default search path.
    ///
    /// Returns the defaults if no file is found. A `CYCLOSPEC_CONFIG` that
    /// points at a missing file is an error rather than silently ignored.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(ConfigError::NotFound(format!(
                    "{} points at {}",
                    CONFIG_ENV_VAR,
                    path.display()
                )));
            }
            return Self::load_from(&path);
        }

        match Self::config_search_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("no configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load and validate configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        let config = Self::parse(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// Parsing does not validate; call [`validate`](Self::validate).
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
    }

    /// Candidate files, in search order, after the environment variable.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./cyclospec.yaml")];

        if let Some(dirs) = directories::ProjectDirs::from("", "", "cyclospec") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }

        paths.push(PathBuf::from("/etc/cyclospec/config.yaml"));
        paths
    }

    /// Check both estimator sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scd
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("scd: {}", e)))?;
        self.ccsd
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("ccsd: {}", e)))?;
        Ok(())
    }

    /// FAM estimator built from the `scd` section.
    pub fn fam_estimator(&self) -> CycloResult<FamEstimator> {
        FamEstimator::new(self.scd.clone())
    }

    /// Cyclic-lag estimator built from the `ccsd` section.
    pub fn ccsd_estimator(&self) -> CycloResult<CcsdEstimator> {
        CcsdEstimator::new(self.ccsd.clone())
    }

    /// Generate an example configuration as YAML.
    pub fn example_yaml() -> String {
        let config = Self {
            scd: ScdConfig::builder()
                .window_size(128)
                .step(32)
                .mode(ScdMode::FamFull)
                .build(),
            ccsd: CcsdConfig::builder()
                .window_size(256)
                .step(256)
                .sigma(0.5)
                .kernel(Kernel::TanhProduct)
                .build(),
            ..Default::default()
        };

        serde_yaml::to_string(&config).unwrap_or_default()
    }
}
