//! Discovery of local Dropbox folders.
//!
//! The Dropbox desktop client writes an `info.json` describing each linked
//! account:
//!
//! ```json
//! {
//!   "personal": { "path": "/home/u/Dropbox", "host": 123, "is_team": false, "subscription_type": "Basic" },
//!   "business": { "path": "/home/u/Dropbox (Acme)", "host": 456, "is_team": true, "subscription_type": "Business" }
//! }
//! ```
//!
//! When no root is configured, the `path` of every account becomes a watched
//! root.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One linked Dropbox account from `info.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropboxAccount {
    /// Local folder synchronised for this account.
    pub path: Utf8PathBuf,

    /// Host identifier assigned by the client.
    #[serde(default)]
    pub host: u64,

    /// Whether this is a team (business) account.
    #[serde(default)]
    pub is_team: bool,

    /// Subscription tier name.
    #[serde(default)]
    pub subscription_type: String,
}

/// Parses the contents of an `info.json` file.
///
/// Returns the account folders, sorted and deduplicated.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the document is not an object of
/// accounts.
///
/// # Examples
///
/// ```
/// use dbx_core::parse_info_json;
///
/// let roots = parse_info_json(br#"{"personal": {"path": "/home/u/Dropbox"}}"#)?;
/// assert_eq!(roots, vec!["/home/u/Dropbox"]);
/// # Ok::<(), dbx_core::ConfigError>(())
/// ```
pub fn parse_info_json(bytes: &[u8]) -> Result<Vec<Utf8PathBuf>, ConfigError> {
    let accounts: BTreeMap<String, DropboxAccount> = serde_json::from_slice(bytes)?;
    let mut roots: Vec<Utf8PathBuf> = accounts.into_values().map(|a| a.path).collect();
    roots.sort();
    roots.dedup();
    Ok(roots)
}

/// Returns the candidate `info.json` locations for the current user.
///
/// Locations whose base environment variable is unset are omitted.
#[must_use]
pub fn info_json_locations() -> Vec<Utf8PathBuf> {
    let mut locations = Vec::new();
    let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"));
    if let Ok(home) = home {
        locations.push(Utf8Path::new(&home).join(".dropbox").join("info.json"));
    }
    for var in ["APPDATA", "LOCALAPPDATA"] {
        if let Ok(base) = std::env::var(var) {
            locations.push(Utf8Path::new(&base).join("Dropbox").join("info.json"));
        }
    }
    locations
}

/// Reads the first existing `info.json` among `locations`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for an unreadable file other than a missing
/// one, [`ConfigError::Parse`] for a malformed file, and
/// [`ConfigError::NoDropboxRoots`] when no location yields a folder.
pub fn discover_dropbox_roots(locations: &[Utf8PathBuf]) -> Result<Vec<Utf8PathBuf>, ConfigError> {
    for location in locations {
        let bytes = match std::fs::read(location) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::trace!(path = %location, "No Dropbox info.json here");
                continue;
            }
            Err(e) => return Err(ConfigError::io(location, e)),
        };
        let roots = parse_info_json(&bytes)?;
        if !roots.is_empty() {
            tracing::info!(path = %location, count = roots.len(), "Discovered Dropbox folders");
            return Ok(roots);
        }
    }
    Err(ConfigError::NoDropboxRoots {
        searched: locations
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const INFO: &str = r#"{
        "personal": {"path": "/home/u/Dropbox", "host": 1, "is_team": false, "subscription_type": "Basic"},
        "business": {"path": "/home/u/Dropbox (Acme)", "host": 2, "is_team": true, "subscription_type": "Business"}
    }"#;

    #[test]
    fn test_parse_info_json_sorted() {
        let roots = parse_info_json(INFO.as_bytes()).unwrap();
        assert_eq!(roots, vec!["/home/u/Dropbox", "/home/u/Dropbox (Acme)"]);
    }

    #[test]
    fn test_parse_info_json_rejects_garbage() {
        let err = parse_info_json(b"[1, 2]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_discover_skips_missing_locations() {
        let dir = TempDir::new().unwrap();
        let base = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let present = base.join("info.json");
        std::fs::write(&present, INFO).unwrap();

        let roots = discover_dropbox_roots(&[base.join("missing.json"), present]).unwrap();
        assert_eq!(roots.len(), 2);
    }

    #[test]
    fn test_discover_none_found() {
        let err = discover_dropbox_roots(&[Utf8PathBuf::from("/nonexistent/info.json")]).unwrap_err();
        match err {
            ConfigError::NoDropboxRoots { searched } => {
                assert!(searched.contains("/nonexistent/info.json"));
            }
            other => panic!("expected NoDropboxRoots, got {other:?}"),
        }
    }
}
