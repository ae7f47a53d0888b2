//! Per-root map from directory to the rules of its rule file.

use camino::{Utf8Path, Utf8PathBuf};
use dbx_core::{fx_hash_map, FxHashMap};
use dbx_rules::CompiledRuleSet;

/// Compiled rules keyed by the directory holding the rule file.
///
/// A directory without a rule file has no entry. Only the engine that owns
/// the registry mutates it, so it carries no lock.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use dbx_engine::RuleFileRegistry;
/// use dbx_rules::compile_rules;
///
/// let dir = Utf8Path::new("/d");
/// let mut registry = RuleFileRegistry::new();
/// assert!(registry.replace_if_changed(dir, compile_rules(b"/out", dir)?));
/// assert!(!registry.replace_if_changed(dir, compile_rules(b"/out\n", dir)?));
/// assert_eq!(registry.len(), 1);
/// # Ok::<(), dbx_rules::RuleError>(())
/// ```
#[derive(Debug, Default)]
pub struct RuleFileRegistry {
    by_dir: FxHashMap<Utf8PathBuf, CompiledRuleSet>,
}

impl RuleFileRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_dir: fx_hash_map(),
        }
    }

    /// Returns the rules registered for `dir`.
    #[inline]
    #[must_use]
    pub fn get(&self, dir: &Utf8Path) -> Option<&CompiledRuleSet> {
        self.by_dir.get(dir)
    }

    /// Stores `rules` for `dir` unless they equal the current entry.
    ///
    /// Returns `true` if the entry was inserted or changed.
    pub fn replace_if_changed(&mut self, dir: &Utf8Path, rules: CompiledRuleSet) -> bool {
        if self.by_dir.get(dir) == Some(&rules) {
            return false;
        }
        self.by_dir.insert(dir.to_owned(), rules);
        true
    }

    /// Drops the entry for `dir`, returning it.
    pub fn remove(&mut self, dir: &Utf8Path) -> Option<CompiledRuleSet> {
        self.by_dir.remove(dir)
    }

    /// Returns the directories with an entry, sorted.
    #[must_use]
    pub fn dirs(&self) -> Vec<&Utf8Path> {
        let mut dirs: Vec<_> = self.by_dir.keys().map(Utf8PathBuf::as_path).collect();
        dirs.sort_unstable();
        dirs
    }

    /// Returns the number of directories with rules.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_dir.len()
    }

    /// Returns `true` if no directory has rules.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_dir.is_empty()
    }
}
