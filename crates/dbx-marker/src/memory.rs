//! In-process marker for dry runs and tests.

use camino::{Utf8Path, Utf8PathBuf};
use dbx_core::{fx_hash_set, FxHashSet};
use parking_lot::Mutex;

use crate::error::MarkerError;
use crate::IgnoreMarker;

/// Records markers in memory instead of on disk.
///
/// Paths registered with [`fail_on`](Self::fail_on) make every operation on
/// them fail with a permission error, which exercises the error paths of
/// callers.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use dbx_marker::{IgnoreMarker, MemoryMarker};
///
/// let marker = MemoryMarker::new();
/// marker.set_flag(Utf8Path::new("/d/node_modules"))?;
/// assert!(marker.has_flag(Utf8Path::new("/d/node_modules"))?);
/// assert_eq!(marker.flagged(), ["/d/node_modules"]);
/// # Ok::<(), dbx_marker::MarkerError>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryMarker {
    flagged: Mutex<FxHashSet<Utf8PathBuf>>,
    failing: Mutex<FxHashSet<Utf8PathBuf>>,
}

impl MemoryMarker {
    /// Creates a marker with nothing flagged.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flagged: Mutex::new(fx_hash_set()),
            failing: Mutex::new(fx_hash_set()),
        }
    }

    /// Makes every later operation on `path` fail.
    pub fn fail_on(&self, path: impl Into<Utf8PathBuf>) {
        self.failing.lock().insert(path.into());
    }

    /// Returns the flagged paths, sorted.
    #[must_use]
    pub fn flagged(&self) -> Vec<Utf8PathBuf> {
        let mut paths: Vec<_> = self.flagged.lock().iter().cloned().collect();
        paths.sort();
        paths
    }

    fn check(&self, operation: &'static str, path: &Utf8Path) -> Result<(), MarkerError> {
        if self.failing.lock().contains(path) {
            return Err(MarkerError::io(
                operation,
                path,
                std::io::ErrorKind::PermissionDenied.into(),
            ));
        }
        Ok(())
    }
}

impl IgnoreMarker for MemoryMarker {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn set_flag(&self, path: &Utf8Path) -> Result<(), MarkerError> {
        self.check("set", path)?;
        self.flagged.lock().insert(path.to_owned());
        Ok(())
    }

    fn remove_flag(&self, path: &Utf8Path) -> Result<(), MarkerError> {
        self.check("remove", path)?;
        self.flagged.lock().remove(path);
        Ok(())
    }

    fn has_flag(&self, path: &Utf8Path) -> Result<bool, MarkerError> {
        self.check("read", path)?;
        Ok(self.flagged.lock().contains(path))
    }
}
