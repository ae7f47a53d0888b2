//! The ignore engine for one watched root.
//!
//! # Decision
//!
//! A path is marked when a rule covers it and no strict ancestor (up to and
//! including the root) is covered. Once a directory is marked the sync client
//! skips everything beneath it, so descendants are never marked on their own.
//!
//! ```text
//!   root/.dropboxignore: node_modules
//!
//!   root/node_modules            covered, no covered ancestor  -> marked
//!   root/node_modules/x/node_modules   covered, ancestor covered     -> left alone
//!   root/app/node_modules        covered, no covered ancestor  -> marked
//! ```
//!
//! # Events
//!
//! | Operations | Action |
//! |------------|--------|
//! | `CREATE`, `RENAME`, or `WRITE` on a rule file | stat; reload rule file and rewalk its directory if the rules changed; otherwise mark or walk the new entry |
//! | `REMOVE`, `RENAME` | stat; if really gone, forget it and everything below it |

use std::fs;
use std::io;
use std::sync::Arc;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use dbx_core::{EngineConfig, ObservableSet};
use dbx_marker::{IgnoreMarker, MarkerError};
use dbx_rules::{compile_rules, RuleError};
use dbx_watcher::{ChangeEvent, Operations};
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::error::EngineError;
use crate::registry::RuleFileRegistry;

/// The two registries shared by every engine in the process.
///
/// `ignored_paths` holds the paths currently carrying the marker (or that
/// would, in try-run). `rule_files` holds every known rule file.
#[derive(Debug, Clone, Default)]
pub struct SharedSets {
    /// Paths marked as ignored.
    pub ignored_paths: Arc<ObservableSet>,
    /// Known rule files.
    pub rule_files: Arc<ObservableSet>,
}

impl SharedSets {
    /// Creates two empty sets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Keeps the Dropbox ignore markers under one root in line with its rule files.
///
/// Created with [`init`](Self::init), which performs the initial walk, and
/// driven afterwards by [`listen`](Self::listen) or directly through
/// [`handle_event`](Self::handle_event).
#[derive(Debug)]
pub struct IgnoreEngine {
    root: Utf8PathBuf,
    rule_file_name: String,
    try_run: bool,
    registry: RuleFileRegistry,
    sets: SharedSets,
    marker: Arc<dyn IgnoreMarker>,
    pub(crate) cancel: CancellationToken,
}

impl IgnoreEngine {
    /// Resolves `root` and runs the initial walk.
    ///
    /// Walk failures are logged, not returned: a partially walked tree is
    /// still a usable starting state for the live loop.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ResolveRoot`], [`EngineError::NonUtf8Path`] or
    /// [`EngineError::NotADirectory`] if `root` is not a usable directory.
    pub fn init(
        root: &Utf8Path,
        config: &EngineConfig,
        sets: SharedSets,
        marker: Arc<dyn IgnoreMarker>,
        cancel: CancellationToken,
    ) -> Result<Self, EngineError> {
        let root = resolve_root(root)?;
        let mut engine = Self {
            root,
            rule_file_name: config.rule_file_name.clone(),
            try_run: config.try_run,
            registry: RuleFileRegistry::new(),
            sets,
            marker,
            cancel,
        };

        let root = engine.root.clone();
        tracing::info!(
            root = %root,
            try_run = engine.try_run,
            marker = engine.marker.name(),
            "Initial walk started"
        );
        match engine.walk(&root, false) {
            Ok(()) => {}
            Err(err) if err.is_cancellation() => {
                tracing::debug!(root = %root, "Initial walk cancelled");
            }
            Err(err) => tracing::warn!(root = %root, error = %err, "Initial walk failed"),
        }
        tracing::info!(
            root = %root,
            rule_files = engine.registry.len(),
            "Initial walk finished"
        );

        Ok(engine)
    }

    /// Returns the absolute root.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns `true` if markers are never written.
    #[inline]
    #[must_use]
    pub const fn try_run(&self) -> bool {
        self.try_run
    }

    /// Returns the shared set of ignored paths.
    #[inline]
    #[must_use]
    pub fn ignored_paths(&self) -> &Arc<ObservableSet> {
        &self.sets.ignored_paths
    }

    /// Returns the shared set of known rule files.
    #[inline]
    #[must_use]
    pub fn rule_files(&self) -> &Arc<ObservableSet> {
        &self.sets.rule_files
    }

    /// Returns this root's compiled rules.
    #[inline]
    #[must_use]
    pub const fn rules(&self) -> &RuleFileRegistry {
        &self.registry
    }

    /// Returns `true` if `path` must carry the marker.
    #[must_use]
    pub fn should_ignore(&self, path: &Utf8Path) -> bool {
        self.is_covered_by_pattern(path) && !self.is_inside_ignored_ancestor(path)
    }

    /// Returns `true` if a rule file at `path` or above it, up to the root,
    /// matches `path`.
    #[must_use]
    pub fn is_covered_by_pattern(&self, path: &Utf8Path) -> bool {
        let mut current = Some(path);
        while let Some(dir) = current {
            if !dir.starts_with(&self.root) {
                return false;
            }
            if self.registry.get(dir).is_some_and(|rules| rules.is_ignored(path)) {
                return true;
            }
            if dir == self.root {
                return false;
            }
            current = dir.parent();
        }
        false
    }

    /// Returns `true` if any strict ancestor of `path`, up to and including
    /// the root, would itself be marked.
    ///
    /// The topmost covered ancestor has no covered ancestor of its own and so
    /// is marked; it is therefore enough to find any covered ancestor.
    #[must_use]
    pub fn is_inside_ignored_ancestor(&self, path: &Utf8Path) -> bool {
        if path == self.root || !path.starts_with(&self.root) {
            return false;
        }
        let mut current = path.parent();
        while let Some(dir) = current {
            if self.is_covered_by_pattern(dir) {
                return true;
            }
            if dir == self.root {
                return false;
            }
            current = dir.parent();
        }
        false
    }

    /// Walks `start` depth-first, loading rule files and marking paths.
    ///
    /// Marked directories are not descended into. With `skip_start_rule_file`
    /// the rule file directly in `start` is not reloaded.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ShuttingDown`] once cancellation is observed and
    /// [`EngineError::Walk`] if `start` itself cannot be read. Errors on
    /// individual entries are logged and skipped.
    pub fn walk(&mut self, start: &Utf8Path, skip_start_rule_file: bool) -> Result<(), EngineError> {
        let mut entries = WalkDir::new(start)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = entries.next() {
            if self.cancel.is_cancelled() {
                return Err(EngineError::ShuttingDown(start.to_owned()));
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound) => {
                    tracing::trace!(error = %err, "Entry vanished during walk");
                    continue;
                }
                Err(err) if err.depth() == 0 => {
                    return Err(EngineError::Walk {
                        path: start.to_owned(),
                        source: err,
                    });
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Skipping unreadable entry");
                    continue;
                }
            };

            let is_dir = entry.file_type().is_dir();
            let Some(path) = Utf8Path::from_path(entry.path()) else {
                tracing::warn!(path = %entry.path().display(), "Skipping non-UTF-8 path");
                if is_dir {
                    entries.skip_current_dir();
                }
                continue;
            };

            if is_dir && !(skip_start_rule_file && entry.depth() == 0) {
                let rule_file = path.join(&self.rule_file_name);
                if let Err(err) = self.register_rule_file(&rule_file) {
                    tracing::warn!(path = %rule_file, error = %err, "Failed to load rule file");
                }
            }

            if self.should_ignore(path) {
                self.mark(path);
                if is_dir {
                    entries.skip_current_dir();
                }
            }
        }

        Ok(())
    }

    /// Applies one change event.
    ///
    /// Failures are logged; the engine stays usable.
    pub fn handle_event(&mut self, event: &ChangeEvent) {
        let Some(path) = self.normalize_event_path(&event.path) else {
            tracing::warn!(root = %self.root, path = %event.path, "Ignoring event outside the root");
            return;
        };
        let is_rule_file = path.file_name() == Some(self.rule_file_name.as_str());
        tracing::debug!(path = %path, ops = %event.ops, "Handling change event");

        if event.ops.intersects(Operations::CREATE | Operations::RENAME)
            || (is_rule_file && event.ops.contains(Operations::WRITE))
        {
            self.handle_appeared(&path, is_rule_file);
        }
        if event.ops.intersects(Operations::REMOVE | Operations::RENAME) {
            self.handle_vanished(&path, is_rule_file);
        }
    }

    /// Maps an event path onto the root.
    ///
    /// Some backends report paths through another name for the same
    /// directory (`/private/var/...` for `/var/...` on macOS). Such paths are
    /// rebased onto the root at the first occurrence of the root's text.
    #[must_use]
    pub fn normalize_event_path(&self, raw: &Utf8Path) -> Option<Utf8PathBuf> {
        if raw.starts_with(&self.root) {
            return Some(raw.to_owned());
        }
        let root = self.root.as_str();
        let index = raw.as_str().find(root)?;
        let rest = &raw.as_str()[index + root.len()..];
        match rest.chars().next() {
            None => Some(self.root.clone()),
            Some(c) if std::path::is_separator(c) => {
                Some(self.root.join(rest.trim_start_matches(std::path::is_separator)))
            }
            Some(_) => None,
        }
    }

    fn handle_appeared(&mut self, path: &Utf8Path, is_rule_file: bool) {
        // Renames report both names; only the one that exists is actionable.
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::trace!(path = %path, "Path no longer exists");
                return;
            }
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "Failed to stat path");
                return;
            }
        };

        if is_rule_file {
            match self.register_rule_file(path) {
                Ok(true) => {
                    let dir = path.parent().unwrap_or(self.root.as_path()).to_owned();
                    self.rewalk(&dir, true);
                }
                Ok(false) => tracing::debug!(path = %path, "Rule file unchanged"),
                Err(err) => {
                    tracing::warn!(path = %path, error = %err, "Keeping previous rules");
                }
            }
        } else if self.should_ignore(path) {
            self.mark(path);
        } else if metadata.is_dir() && !self.is_inside_ignored_ancestor(path) {
            self.rewalk(path, false);
        }
    }

    fn handle_vanished(&mut self, path: &Utf8Path, is_rule_file: bool) {
        // A fast remove and recreate can deliver the events out of order.
        match fs::symlink_metadata(path) {
            Ok(_) => {
                tracing::trace!(path = %path, "Path still exists");
                return;
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "Failed to stat path");
                return;
            }
        }

        let forgotten = self
            .sets
            .ignored_paths
            .remove_matching(|candidate| Utf8Path::new(candidate).starts_with(path));
        for forgotten in &forgotten {
            tracing::info!(path = %forgotten, "Forgot removed ignored path");
        }

        let stale: Vec<String> = self
            .sets
            .rule_files
            .values()
            .into_iter()
            .filter(|file| Utf8Path::new(file).starts_with(path))
            .collect();
        for file in &stale {
            self.forget_rule_file(Utf8Path::new(file));
        }
        if is_rule_file || !stale.is_empty() {
            self.revalidate_rule_files();
        }
    }

    /// Reads and compiles a rule file, storing it if its rules changed.
    ///
    /// Returns `Ok(false)` if the file does not exist or is unchanged. The
    /// file is recorded as known before compiling, so a broken file is still
    /// listed.
    fn register_rule_file(&mut self, file: &Utf8Path) -> Result<bool, EngineError> {
        let bytes = match fs::read(file) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(source) => {
                return Err(RuleError::Read {
                    path: file.to_owned(),
                    source,
                }
                .into());
            }
        };
        self.sets.rule_files.add(file.as_str());

        let dir = file.parent().unwrap_or(self.root.as_path());
        let rules = compile_rules(&bytes, dir)?;
        let patterns = rules.len();
        if !self.registry.replace_if_changed(dir, rules) {
            return Ok(false);
        }
        tracing::info!(path = %file, patterns, "Loaded rule file");
        Ok(true)
    }

    fn forget_rule_file(&mut self, file: &Utf8Path) {
        if let Some(dir) = file.parent() {
            self.registry.remove(dir);
        }
        if self.sets.rule_files.remove(file.as_str()) {
            tracing::info!(path = %file, "Removed rule file");
        }
    }

    /// Drops rule files of this root that no longer exist on disk.
    fn revalidate_rule_files(&mut self) {
        let known: Vec<String> = self
            .sets
            .rule_files
            .values()
            .into_iter()
            .filter(|file| Utf8Path::new(file).starts_with(&self.root))
            .collect();
        for file in known {
            let file = Utf8Path::new(&file);
            if matches!(fs::symlink_metadata(file), Err(err) if err.kind() == io::ErrorKind::NotFound) {
                self.forget_rule_file(file);
            }
        }

        let orphaned: Vec<Utf8PathBuf> = self
            .registry
            .dirs()
            .into_iter()
            .filter(|dir| !dir.join(&self.rule_file_name).exists())
            .map(Utf8Path::to_owned)
            .collect();
        for dir in orphaned {
            self.registry.remove(&dir);
        }
    }

    fn rewalk(&mut self, dir: &Utf8Path, skip_start_rule_file: bool) {
        match self.walk(dir, skip_start_rule_file) {
            Ok(()) => {}
            Err(err) if err.is_cancellation() => tracing::debug!(path = %dir, "Walk cancelled"),
            Err(err) => tracing::warn!(path = %dir, error = %err, "Failed to walk directory"),
        }
    }

    /// Marks `path` and records it. Under try-run only records it.
    fn mark(&self, path: &Utf8Path) {
        if self.try_run {
            tracing::info!(path = %path, "Try-run: would ignore path");
            self.sets.ignored_paths.add(path.as_str());
            return;
        }
        match self.apply_marker(path) {
            Ok(()) => {
                tracing::info!(path = %path, "Ignored path");
                self.sets.ignored_paths.add(path.as_str());
            }
            Err(err) => tracing::warn!(path = %path, error = %err, "Failed to set ignore marker"),
        }
    }

    fn apply_marker(&self, path: &Utf8Path) -> Result<(), MarkerError> {
        if self.marker.has_flag(path)? {
            tracing::debug!(path = %path, "Marker already present");
            return Ok(());
        }
        self.marker.set_flag(path)
    }
}

/// Makes `root` absolute and lexically clean, and checks it is a directory.
///
/// # Errors
///
/// Returns [`EngineError::ResolveRoot`] if the path cannot be made absolute
/// or inspected, [`EngineError::NonUtf8Path`] if the result is not UTF-8, and
/// [`EngineError::NotADirectory`] if it is not a directory.
pub fn resolve_root(root: &Utf8Path) -> Result<Utf8PathBuf, EngineError> {
    let absolute = std::path::absolute(root).map_err(|source| EngineError::ResolveRoot {
        path: root.to_owned(),
        source,
    })?;
    let absolute = Utf8PathBuf::from_path_buf(absolute).map_err(EngineError::NonUtf8Path)?;

    let mut clean = Utf8PathBuf::new();
    for component in absolute.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                clean.pop();
            }
            other => clean.push(other),
        }
    }

    let metadata = fs::metadata(&clean).map_err(|source| EngineError::ResolveRoot {
        path: root.to_owned(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(EngineError::NotADirectory(clean));
    }
    Ok(clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbx_marker::MemoryMarker;
    use tempfile::TempDir;

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("Invalid path");
        (dir, root)
    }

    fn engine(root: &Utf8Path, try_run: bool) -> (IgnoreEngine, Arc<MemoryMarker>) {
        let marker = Arc::new(MemoryMarker::new());
        let config = EngineConfig {
            try_run,
            ..EngineConfig::default()
        };
        let engine = IgnoreEngine::init(
            root,
            &config,
            SharedSets::new(),
            Arc::clone(&marker) as Arc<dyn IgnoreMarker>,
            CancellationToken::new(),
        )
        .expect("engine should start");
        (engine, marker)
    }

    #[test]
    fn test_basename_rule_marks_outermost_only() {
        let (_dir, root) = temp_root();
        fs::create_dir_all(root.join("node_modules/pkg/node_modules")).unwrap();
        fs::create_dir_all(root.join("app/node_modules")).unwrap();
        fs::write(root.join(".dropboxignore"), "node_modules\n").unwrap();

        let (engine, marker) = engine(&root, false);
        assert_eq!(
            marker.flagged(),
            [root.join("app/node_modules"), root.join("node_modules")]
        );
        assert_eq!(engine.ignored_paths().len(), 2);
        assert!(!engine.should_ignore(&root.join("node_modules/pkg/node_modules")));
        assert!(engine.is_inside_ignored_ancestor(&root.join("node_modules/pkg/node_modules")));
    }

    #[test]
    fn test_should_ignore_is_idempotent() {
        let (_dir, root) = temp_root();
        fs::create_dir_all(root.join("a/target")).unwrap();
        fs::write(root.join(".dropboxignore"), "target").unwrap();

        let (engine, _marker) = engine(&root, false);
        let path = root.join("a/target");
        assert!(engine.should_ignore(&path));
        assert!(engine.should_ignore(&path));
    }

    #[test]
    fn test_nested_rule_file_applies_below_its_directory() {
        let (_dir, root) = temp_root();
        fs::create_dir_all(root.join("sub/cache")).unwrap();
        fs::create_dir_all(root.join("cache")).unwrap();
        fs::write(root.join("sub/.dropboxignore"), "cache").unwrap();

        let (engine, marker) = engine(&root, false);
        assert_eq!(marker.flagged(), [root.join("sub/cache")]);
        assert_eq!(engine.rules().len(), 1);
        assert!(engine.rule_files().has(root.join("sub/.dropboxignore").as_str()));
    }

    #[test]
    fn test_rule_files_inside_ignored_directories_are_not_loaded() {
        let (_dir, root) = temp_root();
        fs::create_dir_all(root.join("vendor/lib")).unwrap();
        fs::write(root.join(".dropboxignore"), "/vendor").unwrap();
        fs::write(root.join("vendor/.dropboxignore"), "lib").unwrap();

        let (engine, marker) = engine(&root, false);
        assert_eq!(marker.flagged(), [root.join("vendor")]);
        assert_eq!(engine.rules().len(), 1);
    }

    #[test]
    fn test_try_run_records_without_marking() {
        let (_dir, root) = temp_root();
        fs::create_dir_all(root.join("build")).unwrap();
        fs::write(root.join(".dropboxignore"), "/build").unwrap();

        let (engine, marker) = engine(&root, true);
        assert!(engine.try_run());
        assert!(marker.flagged().is_empty());
        assert_eq!(engine.ignored_paths().values(), [root.join("build").to_string()]);
    }

    #[test]
    fn test_marker_failure_is_not_recorded() {
        let (_dir, root) = temp_root();
        fs::create_dir_all(root.join("locked")).unwrap();
        fs::create_dir_all(root.join("open")).unwrap();
        fs::write(root.join(".dropboxignore"), "/locked\n/open").unwrap();

        let marker = Arc::new(MemoryMarker::new());
        marker.fail_on(root.join("locked"));
        let engine = IgnoreEngine::init(
            &root,
            &EngineConfig::default(),
            SharedSets::new(),
            Arc::clone(&marker) as Arc<dyn IgnoreMarker>,
            CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(engine.ignored_paths().values(), [root.join("open").to_string()]);
    }

    #[test]
    fn test_invalid_rule_file_is_listed_but_not_applied() {
        let (_dir, root) = temp_root();
        fs::create_dir_all(root.join("keep")).unwrap();
        fs::write(root.join(".dropboxignore"), "keep\n!keep/me").unwrap();

        let (engine, marker) = engine(&root, false);
        assert!(marker.flagged().is_empty());
        assert!(engine.rules().is_empty());
        assert_eq!(engine.rule_files().len(), 1);
    }

    #[test]
    fn test_cancelled_walk_reports_shutting_down() {
        let (_dir, root) = temp_root();
        fs::create_dir_all(root.join("a")).unwrap();
        let (mut engine, _marker) = engine(&root, false);

        engine.cancel.cancel();
        let err = engine.walk(&root, false).unwrap_err();
        assert!(err.is_cancellation());
    }

    #[test]
    fn test_normalize_event_path() {
        let (_dir, root) = temp_root();
        let (engine, _marker) = engine(&root, false);

        let inside = root.join("a/b");
        assert_eq!(engine.normalize_event_path(&inside), Some(inside.clone()));

        let aliased = Utf8PathBuf::from(format!("/private{root}/a/b"));
        assert_eq!(engine.normalize_event_path(&aliased), Some(inside));
        assert_eq!(
            engine.normalize_event_path(&Utf8PathBuf::from(format!("/private{root}"))),
            Some(root.clone())
        );

        let sibling = Utf8PathBuf::from(format!("{root}-other/a"));
        assert_eq!(engine.normalize_event_path(&sibling), None);
        assert_eq!(engine.normalize_event_path(Utf8Path::new("/elsewhere")), None);
    }

    #[test]
    fn test_resolve_root_cleans_dot_segments() {
        let (_dir, root) = temp_root();
        fs::create_dir_all(root.join("a")).unwrap();
        let resolved = resolve_root(&root.join("a/./../a")).unwrap();
        assert_eq!(resolved, root.join("a"));
    }

    #[test]
    fn test_resolve_root_rejects_files() {
        let (_dir, root) = temp_root();
        fs::write(root.join("file"), "").unwrap();
        assert!(matches!(
            resolve_root(&root.join("file")),
            Err(EngineError::NotADirectory(_))
        ));
        assert!(matches!(
            resolve_root(&root.join("missing")),
            Err(EngineError::ResolveRoot { .. })
        ));
    }
}
