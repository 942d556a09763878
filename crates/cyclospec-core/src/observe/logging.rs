//! # Structured Logging
//!
//! The estimators emit `tracing` events (`debug!` for padding decisions and
//! output shapes, `warn!` for rows that cannot be normalized, `trace!` for
//! per-stage detail). Nothing is printed unless the application installs a
//! subscriber, which [`init_logging`] does from a [`LogConfig`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use cyclospec_core::observe::{init_logging, LogConfig, LogFormat, LogLevel};
//!
//! let config = LogConfig {
//!     level: LogLevel::Debug,
//!     format: LogFormat::Json,
//!     ..Default::default()
//! };
//! init_logging(&config);
//!
//! tracing::info!(rows = 16, "batch started");
//! ```

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, registry::Registry, EnvFilter, Layer};

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Machine-readable, one JSON object per event
    Json,
    /// Multi-line, human-readable
    Pretty,
    /// One line per event
    #[default]
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Include source location (file:line)
    pub source_location: bool,
    /// Include thread IDs; useful when the rayon pool is active
    pub thread_ids: bool,
    /// Directive string overriding `level`, e.g. `"cyclospec_core=trace"`
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            source_location: false,
            thread_ids: false,
            filter: None,
        }
    }
}

impl LogConfig {
    /// Verbose, human-readable output with thread IDs.
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            source_location: true,
            thread_ids: true,
            ..Default::default()
        }
    }

    /// JSON at info level.
    pub fn production() -> Self {
        Self {
            format: LogFormat::Json,
            ..Default::default()
        }
    }

    /// Errors only.
    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Error,
            ..Default::default()
        }
    }

    /// Filter directives in effect for this configuration.
    ///
    /// An explicit `filter` wins over `RUST_LOG`, which wins over `level`.
    pub fn env_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.level.to_string());
        match &self.filter {
            Some(custom) => EnvFilter::try_new(custom).unwrap_or_else(|_| fallback()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
        }
    }

    fn format_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(self.source_location)
            .with_line_number(self.source_location)
            .with_thread_ids(self.thread_ids);
        match self.format {
            LogFormat::Json => layer.json().boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            LogFormat::Compact => layer.compact().boxed(),
        }
    }
}

/// Install the global logging subscriber.
///
/// Returns `false` if a global subscriber was already set, in which case the
/// existing one is left in place.
pub fn init_logging(config: &LogConfig) -> bool {
    let subscriber = tracing_subscriber::registry()
        .with(config.format_layer())
        .with(config.env_filter());
    tracing::subscriber::set_global_default(subscriber).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_config_presets() {
        let dev = LogConfig::development();
        assert_eq!(dev.level, LogLevel::Debug);
        assert_eq!(dev.format, LogFormat::Pretty);
        assert!(dev.thread_ids);

        assert_eq!(LogConfig::production().format, LogFormat::Json);
        assert_eq!(LogConfig::quiet().level, LogLevel::Error);
    }

    #[test]
    fn test_explicit_filter_wins() {
        let config = LogConfig {
            filter: Some("cyclospec_core=trace".to_string()),
            ..Default::default()
        };
        assert_eq!(config.env_filter().to_string(), "cyclospec_core=trace");
    }

    #[test]
    fn test_partial_yaml() {
        let config: LogConfig = serde_yaml::from_str("level: debug\nformat: json\n").unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.source_location);
        assert_eq!(config.filter, None);
    }

    #[test]
    fn test_second_init_is_ignored() {
        let config = LogConfig::quiet();
        init_logging(&config);
        assert!(!init_logging(&config));
    }
}
