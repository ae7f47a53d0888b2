//! Normalized change events.
//!
//! Raw `notify` events carry a detailed [`EventKind`] and any number of paths.
//! They are reduced here to one [`ChangeEvent`] per path with an
//! [`Operations`] set:
//!
//! | notify kind | Operations |
//! |-------------|------------|
//! | `Create(_)` | `CREATE` |
//! | `Remove(_)` | `REMOVE` |
//! | `Modify(Name(_))` | `RENAME` (for each path involved) |
//! | `Modify(Data(_))`, `Modify(Any)`, `Modify(Other)` | `WRITE` |
//! | `Access(Close(Write))` | `WRITE` |
//! | `Any` | `CREATE \| REMOVE \| WRITE` |
//! | `Modify(Metadata(_))`, other `Access(_)`, `Other` | dropped |

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::time::Instant;

use camino::Utf8PathBuf;
use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::EventKind;
use smallvec::SmallVec;

/// A set of change operations observed for one path.
///
/// # Examples
///
/// ```
/// use dbx_watcher::Operations;
///
/// let ops = Operations::CREATE | Operations::RENAME;
/// assert!(ops.contains(Operations::RENAME));
/// assert!(!ops.contains(Operations::REMOVE));
/// assert_eq!(ops.to_string(), "CREATE|RENAME");
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Operations(u8);

impl Operations {
    /// The path appeared.
    pub const CREATE: Self = Self(1);
    /// The path's content was written.
    pub const WRITE: Self = Self(1 << 1);
    /// The path disappeared.
    pub const REMOVE: Self = Self(1 << 2);
    /// The path was renamed, from or to this name.
    pub const RENAME: Self = Self(1 << 3);

    const NAMES: [(Self, &'static str); 4] = [
        (Self::CREATE, "CREATE"),
        (Self::WRITE, "WRITE"),
        (Self::REMOVE, "REMOVE"),
        (Self::RENAME, "RENAME"),
    ];

    /// Returns the empty set.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns `true` if no operation is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every operation in `other` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if any operation in `other` is set.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Maps a notify event kind to operations. Empty means "ignore".
    #[must_use]
    pub fn from_kind(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => Self::CREATE,
            EventKind::Remove(_) => Self::REMOVE,
            EventKind::Modify(ModifyKind::Name(_)) => Self::RENAME,
            EventKind::Modify(ModifyKind::Metadata(_)) => Self::empty(),
            EventKind::Modify(_) | EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
                Self::WRITE
            }
            EventKind::Any => Self::CREATE | Self::REMOVE | Self::WRITE,
            EventKind::Access(_) | EventKind::Other => Self::empty(),
        }
    }
}

impl BitOr for Operations {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Operations {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Operations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (op, name) in Self::NAMES {
            if self.contains(op) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("NONE")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Operations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Operations({self})")
    }
}

/// A change to one path, as delivered to consumers.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use dbx_watcher::{ChangeEvent, Operations};
///
/// let event = ChangeEvent::new(Utf8PathBuf::from("/d/.dropboxignore"), Operations::WRITE);
/// assert_eq!(event.file_name(), Some(".dropboxignore"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Absolute path of the entry that changed.
    pub path: Utf8PathBuf,

    /// What happened to it.
    pub ops: Operations,

    /// When the event was received from the backend.
    pub timestamp: Instant,
}

impl ChangeEvent {
    /// Creates an event stamped with the current instant.
    #[inline]
    #[must_use]
    pub fn new(path: Utf8PathBuf, ops: Operations) -> Self {
        Self {
            path,
            ops,
            timestamp: Instant::now(),
        }
    }

    /// Returns the final path component, if any.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }
}

/// Converts one notify event into change events, one per UTF-8 path.
///
/// Non-UTF-8 paths are returned separately so the caller can report them.
pub(crate) fn normalize(
    event: notify::Event,
) -> (SmallVec<[ChangeEvent; 2]>, SmallVec<[std::path::PathBuf; 1]>) {
    let mut changes = SmallVec::new();
    let mut rejected = SmallVec::new();

    let ops = Operations::from_kind(&event.kind);
    if ops.is_empty() {
        return (changes, rejected);
    }
    for path in event.paths {
        match Utf8PathBuf::try_from(path) {
            Ok(path) => changes.push(ChangeEvent::new(path, ops)),
            Err(e) => rejected.push(e.into_path_buf()),
        }
    }
    (changes, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode};
    use std::path::PathBuf;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            Operations::from_kind(&EventKind::Create(CreateKind::File)),
            Operations::CREATE
        );
        assert_eq!(
            Operations::from_kind(&EventKind::Remove(RemoveKind::Folder)),
            Operations::REMOVE
        );
        assert_eq!(
            Operations::from_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::From))),
            Operations::RENAME
        );
        assert_eq!(
            Operations::from_kind(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Operations::WRITE
        );
        assert_eq!(
            Operations::from_kind(&EventKind::Access(AccessKind::Close(AccessMode::Write))),
            Operations::WRITE
        );
    }

    #[test]
    fn test_uninteresting_kinds_are_dropped() {
        assert!(
            Operations::from_kind(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)))
                .is_empty()
        );
        assert!(Operations::from_kind(&EventKind::Access(AccessKind::Read)).is_empty());
        assert!(Operations::from_kind(&EventKind::Other).is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(Operations::empty().to_string(), "NONE");
        assert_eq!(
            (Operations::REMOVE | Operations::CREATE).to_string(),
            "CREATE|REMOVE"
        );
    }

    #[test]
    fn test_bitor_assign_and_intersects() {
        let mut ops = Operations::WRITE;
        ops |= Operations::RENAME;
        assert!(ops.intersects(Operations::RENAME | Operations::REMOVE));
        assert!(!ops.contains(Operations::RENAME | Operations::REMOVE));
    }

    #[test]
    fn test_normalize_rename_both_emits_two_events() {
        let event = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/r/old"))
            .add_path(PathBuf::from("/r/new"));

        let (changes, rejected) = normalize(event);
        assert!(rejected.is_empty());
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].path, "/r/old");
        assert_eq!(changes[1].path, "/r/new");
        assert!(changes.iter().all(|c| c.ops == Operations::RENAME));
    }

    #[test]
    fn test_normalize_drops_metadata() {
        let event = notify::Event::new(EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Extended,
        )))
        .add_path(PathBuf::from("/r/file"));

        let (changes, _) = normalize(event);
        assert!(changes.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_normalize_rejects_non_utf8() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let bad = PathBuf::from(OsStr::from_bytes(b"/r/\xff"));
        let event = notify::Event::new(EventKind::Create(CreateKind::File)).add_path(bad);

        let (changes, rejected) = normalize(event);
        assert!(changes.is_empty());
        assert_eq!(rejected.len(), 1);
    }
}
