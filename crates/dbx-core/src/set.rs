//! A sorted, thread-safe string set that notifies listeners on change.
//!
//! [`ObservableSet`] holds the process-wide registries shared by every engine:
//! the paths that have been marked ignored and the rule files that are known.
//! Consumers subscribe to additions, removals, or whole-set changes without
//! polling.
//!
//! # Concurrency
//!
//! Mutations and reads take one internal lock. Listeners are invoked on the
//! mutating thread *after* the lock is released, so a listener may read or
//! mutate the set again without deadlocking. Listeners registered or removed
//! during a notification take effect for the next mutation.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use dbx_core::ObservableSet;
//!
//! let set = ObservableSet::new();
//! let added = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&added);
//! set.on_add(move |_| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! assert!(set.add("/dropbox/node_modules"));
//! assert!(!set.add("/dropbox/node_modules"));
//! assert_eq!(added.load(Ordering::SeqCst), 1);
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Listener invoked with the single value that was added or removed.
type ItemListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Listener invoked with a sorted snapshot of the values after a change.
type ChangeListener = Arc<dyn Fn(&[String]) + Send + Sync>;

/// Handle returned when registering a listener, used to unregister it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Inner {
    values: BTreeSet<String>,
    on_add: Vec<(ListenerId, ItemListener)>,
    on_remove: Vec<(ListenerId, ItemListener)>,
    on_change: Vec<(ListenerId, ChangeListener)>,
    next_id: u64,
}

impl Inner {
    fn next_id(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }

    fn snapshot_if_observed(&self) -> Option<Vec<String>> {
        (!self.on_change.is_empty()).then(|| self.values.iter().cloned().collect())
    }
}

/// Notifications collected under the lock and delivered after it is dropped.
struct Pending {
    items: Vec<ItemListener>,
    changes: Vec<ChangeListener>,
    snapshot: Option<Vec<String>>,
}

impl Pending {
    fn deliver(self, value: &str) {
        for listener in &self.items {
            listener(value);
        }
        if let Some(snapshot) = self.snapshot {
            for listener in &self.changes {
                listener(&snapshot);
            }
        }
    }
}

/// A sorted set of strings with add/remove/change listeners.
///
/// All operations are safe to call from any thread.
#[derive(Default)]
pub struct ObservableSet {
    inner: Mutex<Inner>,
}

impl fmt::Debug for ObservableSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ObservableSet")
            .field("len", &inner.values.len())
            .field("on_add", &inner.on_add.len())
            .field("on_remove", &inner.on_remove.len())
            .field("on_change", &inner.on_change.len())
            .finish()
    }
}

impl ObservableSet {
    /// Creates an empty set with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value`.
    ///
    /// Returns `true` and notifies add and change listeners if the value was
    /// not already present. Re-adding an existing value is a silent no-op.
    pub fn add(&self, value: impl Into<String>) -> bool {
        let value = value.into();
        let pending = {
            let mut inner = self.inner.lock();
            if !inner.values.insert(value.clone()) {
                return false;
            }
            Pending {
                items: inner.on_add.iter().map(|(_, l)| Arc::clone(l)).collect(),
                changes: inner.on_change.iter().map(|(_, l)| Arc::clone(l)).collect(),
                snapshot: inner.snapshot_if_observed(),
            }
        };
        pending.deliver(&value);
        true
    }

    /// Removes `value`.
    ///
    /// Returns `true` and notifies remove and change listeners if the value
    /// was present. Removing an absent value is a silent no-op.
    pub fn remove(&self, value: &str) -> bool {
        let pending = {
            let mut inner = self.inner.lock();
            if !inner.values.remove(value) {
                return false;
            }
            Pending {
                items: inner.on_remove.iter().map(|(_, l)| Arc::clone(l)).collect(),
                changes: inner.on_change.iter().map(|(_, l)| Arc::clone(l)).collect(),
                snapshot: inner.snapshot_if_observed(),
            }
        };
        pending.deliver(value);
        true
    }

    /// Removes every value matching `predicate`, notifying once per value.
    ///
    /// Returns the removed values in sorted order.
    pub fn remove_matching(&self, predicate: impl Fn(&str) -> bool) -> Vec<String> {
        let candidates: Vec<String> = {
            let inner = self.inner.lock();
            inner
                .values
                .iter()
                .filter(|v| predicate(v))
                .cloned()
                .collect()
        };
        candidates.into_iter().filter(|v| self.remove(v)).collect()
    }

    /// Removes every value, notifying once per value.
    pub fn clear(&self) {
        self.remove_matching(|_| true);
    }

    /// Returns `true` if `value` is present.
    #[must_use]
    pub fn has(&self, value: &str) -> bool {
        self.inner.lock().values.contains(value)
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().values.len()
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().values.is_empty()
    }

    /// Returns a sorted snapshot of the values.
    #[must_use]
    pub fn values(&self) -> Vec<String> {
        self.inner.lock().values.iter().cloned().collect()
    }

    /// Registers a listener called with each newly added value.
    pub fn on_add(&self, listener: impl Fn(&str) + Send + Sync + 'static) -> ListenerId {
        let mut inner = self.inner.lock();
        let id = inner.next_id();
        inner.on_add.push((id, Arc::new(listener)));
        id
    }

    /// Registers a listener called with each removed value.
    pub fn on_remove(&self, listener: impl Fn(&str) + Send + Sync + 'static) -> ListenerId {
        let mut inner = self.inner.lock();
        let id = inner.next_id();
        inner.on_remove.push((id, Arc::new(listener)));
        id
    }

    /// Registers a listener called with the sorted values after every change.
    pub fn on_change(&self, listener: impl Fn(&[String]) + Send + Sync + 'static) -> ListenerId {
        let mut inner = self.inner.lock();
        let id = inner.next_id();
        inner.on_change.push((id, Arc::new(listener)));
        id
    }

    /// Unregisters a listener. Returns `false` if `id` was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.on_add.len() + inner.on_remove.len() + inner.on_change.len();
        inner.on_add.retain(|(i, _)| *i != id);
        inner.on_remove.retain(|(i, _)| *i != id);
        inner.on_change.retain(|(i, _)| *i != id);
        before != inner.on_add.len() + inner.on_remove.len() + inner.on_change.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |v: &str| sink.lock().push(v.to_owned()))
    }

    #[test]
    fn test_values_are_sorted() {
        let set = ObservableSet::new();
        set.add("c");
        set.add("a");
        set.add("b");
        assert_eq!(set.values(), vec!["a", "b", "c"]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_add_is_idempotent() {
        let set = ObservableSet::new();
        let (seen, listener) = recorder();
        set.on_add(listener);

        assert!(set.add("x"));
        assert!(!set.add("x"));
        assert_eq!(*seen.lock(), vec!["x"]);
    }

    #[test]
    fn test_remove_absent_is_silent() {
        let set = ObservableSet::new();
        let (seen, listener) = recorder();
        set.on_remove(listener);

        assert!(!set.remove("missing"));
        set.add("present");
        assert!(set.remove("present"));
        assert!(!set.remove("present"));
        assert_eq!(*seen.lock(), vec!["present"]);
    }

    #[test]
    fn test_change_listener_receives_snapshot() {
        let set = ObservableSet::new();
        let snapshots = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&snapshots);
        set.on_change(move |values| sink.lock().push(values.to_vec()));

        set.add("b");
        set.add("a");
        set.remove("b");

        let snapshots = snapshots.lock();
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[1], vec!["a", "b"]);
        assert_eq!(snapshots[2], vec!["a"]);
    }

    #[test]
    fn test_remove_listener() {
        let set = ObservableSet::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let id = set.on_add(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        set.add("one");
        assert!(set.remove_listener(id));
        assert!(!set.remove_listener(id));
        set.add("two");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_may_reenter_set() {
        let set = Arc::new(ObservableSet::new());
        let inner = Arc::clone(&set);
        set.on_add(move |v| {
            if v == "trigger" {
                inner.add("follow-up");
            }
        });

        set.add("trigger");
        assert!(set.has("follow-up"));
    }

    #[test]
    fn test_remove_matching_notifies_each() {
        let set = ObservableSet::new();
        let (seen, listener) = recorder();
        set.on_remove(listener);
        for v in ["/r/a", "/r/a/b", "/r/ab", "/r/c"] {
            set.add(v);
        }

        let removed = set.remove_matching(|v| v == "/r/a" || v.starts_with("/r/a/"));
        assert_eq!(removed, vec!["/r/a", "/r/a/b"]);
        assert_eq!(*seen.lock(), vec!["/r/a", "/r/a/b"]);
        assert_eq!(set.values(), vec!["/r/ab", "/r/c"]);
    }

    #[test]
    fn test_clear() {
        let set = ObservableSet::new();
        set.add("a");
        set.add("b");
        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn test_concurrent_adds() {
        let set = Arc::new(ObservableSet::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let set = Arc::clone(&set);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        set.add(format!("{t}-{i}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(set.len(), 800);
    }
}
