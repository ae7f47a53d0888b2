//! Configuration structures for dbx-ignore.
//!
//! This module provides configuration types for every component:
//!
//! - [`EngineConfig`] - Rule file name and try-run mode
//! - [`WatchConfig`] - Change watcher settings (channel capacity, recursion)
//! - [`ReportConfig`] - Debounced status summary and optional JSON report
//! - [`Config`] - Root configuration combining all settings plus the roots
//!
//! All configuration types implement [`Default`] and deserialize with
//! `#[serde(default)]`, so a configuration file only needs the keys it changes.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name of the per-directory rule file recognised by default.
pub const DEFAULT_RULE_FILE_NAME: &str = ".dropboxignore";

/// Configuration for an ignore engine.
///
/// # Examples
///
/// ```
/// use dbx_core::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.rule_file_name, ".dropboxignore");
/// assert!(!config.try_run);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// File name of the per-directory rule files.
    pub rule_file_name: String,

    /// When set, decisions are logged and recorded but no marker is written.
    pub try_run: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rule_file_name: DEFAULT_RULE_FILE_NAME.to_owned(),
            try_run: false,
        }
    }
}

/// Configuration for the change watcher.
///
/// # Examples
///
/// ```
/// use dbx_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.channel_capacity, 256);
/// assert!(config.recursive);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Capacity of the bounded channel between the OS watcher and the engine.
    ///
    /// When full, the watcher thread blocks until the engine catches up.
    pub channel_capacity: usize,

    /// Whether to watch subdirectories recursively.
    pub recursive: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            recursive: true,
        }
    }
}

/// Configuration for the status report produced while watching.
///
/// # Examples
///
/// ```
/// use dbx_core::ReportConfig;
///
/// let config = ReportConfig::default();
/// assert_eq!(config.debounce_ms, 500);
/// assert!(config.output.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Quiescence interval between two summaries, in milliseconds.
    pub debounce_ms: u64,

    /// Optional file the JSON report is written to on every summary.
    pub output: Option<Utf8PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            output: None,
        }
    }
}

/// Root configuration for dbx-ignore.
///
/// # Examples
///
/// ```
/// use dbx_core::Config;
///
/// let config: Config = serde_json::from_str(r#"{"engine": {"try_run": true}}"#)?;
/// assert!(config.engine.try_run);
/// assert!(config.roots.is_empty());
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories to watch. Empty means "discover the Dropbox folders".
    pub roots: Vec<Utf8PathBuf>,

    /// Engine configuration shared by every root.
    pub engine: EngineConfig,

    /// Change watcher configuration.
    pub watch: WatchConfig,

    /// Status report configuration.
    pub report: ReportConfig,
}

impl Config {
    /// Loads a configuration from a JSON file.
    ///
    /// Missing keys take their default values. The result is validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it is not valid JSON for this structure, and
    /// [`ConfigError::InvalidOption`] if validation fails.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        tracing::debug!(path = %path, roots = config.roots.len(), "Loaded configuration");
        Ok(config)
    }

    /// Checks option values that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] for an empty rule file name, a
    /// rule file name containing a path separator, or a zero channel capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = &self.engine.rule_file_name;
        if name.is_empty() {
            return Err(ConfigError::invalid_option(
                "engine.rule_file_name",
                "must not be empty",
            ));
        }
        if name.contains(['/', '\\']) {
            return Err(ConfigError::invalid_option(
                "engine.rule_file_name",
                "must be a bare file name",
            ));
        }
        if self.watch.channel_capacity == 0 {
            return Err(ConfigError::invalid_option(
                "watch.channel_capacity",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}
