//! Fast hash map and hash set type aliases.
//!
//! The rule-file registry is keyed by directory path and looked up once per
//! ancestor for every decision, so it uses the Fx hash from `rustc-hash`
//! instead of SipHash. Keys are local paths, never attacker-chosen input at a
//! scale where denial-of-service resistance would matter.
//!
//! # Examples
//!
//! ```
//! use dbx_core::{FxHashMap, FxHashSet, fx_hash_map, fx_hash_set};
//!
//! let mut rules: FxHashMap<String, usize> = fx_hash_map();
//! rules.insert("/dropbox/project".to_owned(), 3);
//!
//! let marked: FxHashSet<&str> = fx_hash_set();
//! assert!(marked.is_empty());
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates a new empty [`FxHashMap`].
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates a new empty [`FxHashSet`].
#[inline]
#[must_use]
pub fn fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}
