//! Identity-keyed classification sets.
//!
//! A [`ClassificationSet`] maps [`ObjectId`]s to an optional display name.
//! Its contents are produced by a [`Collector`] the first time any operation
//! touches the set, then cached until reset. Mutation goes through the
//! registry's overrides; `add` and `remove` materialize first.

use crate::identity::ObjectId;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Identity to display-name mapping. Entries added by overrides carry no name.
pub type IdentityNames = BTreeMap<ObjectId, Option<String>>;

/// Produces the initial contents of a classification set.
pub trait Collector: Send + Sync {
    /// Short label for diagnostics.
    fn label(&self) -> &'static str;

    /// Compute the full mapping. Called at most once per materialization.
    fn collect(&self) -> IdentityNames;
}

pub struct ClassificationSet {
    collector: Box<dyn Collector>,
    entries: Mutex<Option<IdentityNames>>,
}

impl ClassificationSet {
    pub fn new(collector: impl Collector + 'static) -> Self {
        Self {
            collector: Box::new(collector),
            entries: Mutex::new(None),
        }
    }

    pub fn label(&self) -> &'static str {
        self.collector.label()
    }

    fn lock(&self) -> MutexGuard<'_, Option<IdentityNames>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the materialized entries, collecting them first if
    /// needed. The lock is held across collection, so concurrent first
    /// access populates exactly once.
    fn with_entries<R>(&self, f: impl FnOnce(&mut IdentityNames) -> R) -> R {
        let mut guard = self.lock();
        let entries = guard.get_or_insert_with(|| {
            let collected = self.collector.collect();
            debug!(
                set = self.collector.label(),
                entries = collected.len(),
                "materialized classification set"
            );
            collected
        });
        f(entries)
    }

    /// Materialize the set and return its size.
    pub fn materialize(&self) -> usize {
        self.with_entries(|entries| entries.len())
    }

    pub fn is_materialized(&self) -> bool {
        self.lock().is_some()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.with_entries(|entries| entries.contains_key(&id))
    }

    /// Recorded display name for `id`, if any.
    pub fn name(&self, id: ObjectId) -> Option<String> {
        self.with_entries(|entries| entries.get(&id).cloned().flatten())
    }

    /// Recorded display name for `id`, or `default`.
    pub fn get_name(&self, id: ObjectId, default: &str) -> String {
        self.name(id).unwrap_or_else(|| default.to_string())
    }

    /// Insert `id` without a name. An existing entry keeps its name.
    pub(crate) fn add(&self, id: ObjectId) {
        self.with_entries(|entries| {
            entries.entry(id).or_insert(None);
        });
    }

    /// Remove `id`. Absent identities are ignored.
    pub(crate) fn remove(&self, id: ObjectId) {
        self.with_entries(|entries| {
            entries.remove(&id);
        });
    }

    pub fn len(&self) -> usize {
        self.materialize()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the materialized contents.
    pub fn snapshot(&self) -> IdentityNames {
        self.with_entries(|entries| entries.clone())
    }

    /// Drop cached contents; the next access collects again.
    pub(crate) fn reset(&self) {
        *self.lock() = None;
        debug!(set = self.collector.label(), "reset classification set");
    }
}

impl std::fmt::Debug for ClassificationSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationSet")
            .field("label", &self.label())
            .field("materialized", &self.is_materialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: Arc<AtomicUsize>,
        seed: Vec<(ObjectId, &'static str)>,
    }

    impl Collector for Counting {
        fn label(&self) -> &'static str {
            "counting"
        }

        fn collect(&self) -> IdentityNames {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seed
                .iter()
                .map(|(id, name)| (*id, Some((*name).to_string())))
                .collect()
        }
    }

    fn counting_set(seed: Vec<(ObjectId, &'static str)>) -> (ClassificationSet, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let set = ClassificationSet::new(Counting {
            calls: Arc::clone(&calls),
            seed,
        });
        (set, calls)
    }

    #[test]
    fn collects_lazily_and_once() {
        let a = ObjectId::issue();
        let (set, calls) = counting_set(vec![(a, "m.a")]);
        assert!(!set.is_materialized());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(set.contains(a));
        assert!(set.contains(a));
        assert_eq!(set.get_name(a, "fallback"), "m.a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn mutation_before_query_materializes_first() {
        let a = ObjectId::issue();
        let b = ObjectId::issue();
        let (set, calls) = counting_set(vec![(a, "m.a")]);

        set.add(b);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(set.contains(a));
        assert!(set.contains(b));
        assert_eq!(set.name(b), None);
        assert_eq!(set.get_name(b, "fallback"), "fallback");
    }

    #[test]
    fn add_keeps_existing_name_and_remove_is_lenient() {
        let a = ObjectId::issue();
        let absent = ObjectId::issue();
        let (set, _) = counting_set(vec![(a, "m.a")]);

        set.add(a);
        assert_eq!(set.name(a).as_deref(), Some("m.a"));

        set.remove(absent);
        set.remove(a);
        set.remove(a);
        assert!(!set.contains(a));
        assert!(set.is_empty());
    }

    #[test]
    fn reset_recollects_and_drops_mutations() {
        let a = ObjectId::issue();
        let b = ObjectId::issue();
        let (set, calls) = counting_set(vec![(a, "m.a")]);

        set.remove(a);
        set.add(b);
        set.reset();
        assert!(!set.is_materialized());

        assert!(set.contains(a));
        assert!(!set.contains(b));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_first_access_collects_once() {
        let a = ObjectId::issue();
        let (set, calls) = counting_set(vec![(a, "m.a")]);
        let set = Arc::new(set);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let set = Arc::clone(&set);
                std::thread::spawn(move || set.contains(a))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().expect("thread should not panic"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
