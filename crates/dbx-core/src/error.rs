//! Error types for the dbx-core crate.
//!
//! [`ConfigError`] covers loading and validating the JSON configuration and
//! discovering Dropbox folders from the desktop client's `info.json`.

use camino::Utf8PathBuf;

/// Errors that can occur while loading configuration or discovering roots.
///
/// # Examples
///
/// ```
/// use dbx_core::ConfigError;
/// use camino::Utf8PathBuf;
///
/// let error = ConfigError::MissingDirectory(Utf8PathBuf::from("/some/path"));
/// assert!(error.to_string().contains("/some/path"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The provided path is invalid or malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: Utf8PathBuf,
        /// Explanation of why the path is invalid.
        reason: String,
    },

    /// A root that should be watched does not exist or is not a directory.
    #[error("missing required directory: {0}")]
    MissingDirectory(Utf8PathBuf),

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// No root was configured and no Dropbox installation was found.
    #[error("no Dropbox folder found (searched: {searched})")]
    NoDropboxRoots {
        /// Comma separated list of the `info.json` locations tried.
        searched: String,
    },

    /// An I/O error occurred while reading configuration.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file being read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a JSON file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates an [`InvalidOption`](Self::InvalidOption) error.
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }

    /// Creates an [`Io`](Self::Io) error for the given file.
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_path_display() {
        let error = ConfigError::InvalidPath {
            path: Utf8PathBuf::from("relative/root"),
            reason: "root must be absolute".to_owned(),
        };
        let msg = error.to_string();
        assert!(msg.contains("relative/root"));
        assert!(msg.contains("must be absolute"));
    }

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::invalid_option("engine.rule_file_name", "must not be empty");
        let msg = error.to_string();
        assert!(msg.contains("engine.rule_file_name"));
        assert!(msg.contains("must not be empty"));
    }

    #[test]
    fn test_io_display_includes_path() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = ConfigError::io("/etc/dbx.json", source);
        assert!(error.to_string().contains("/etc/dbx.json"));
    }

    #[test]
    fn test_no_dropbox_roots_display() {
        let error = ConfigError::NoDropboxRoots {
            searched: "/home/u/.dropbox/info.json".to_owned(),
        };
        assert!(error.to_string().contains(".dropbox/info.json"));
    }
}
