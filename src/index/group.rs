//! Record group: writes that fan out to every member index
//!
//! A group owns one reader/writer lock guarding the list of member trees.
//! Every group write holds the write lock for the whole fan-out, so readers
//! see either none or all of it.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use super::btree::IndexTree;
use super::errors::IndexResult;
use super::handle::Index;
use crate::config::RecmgrConfig;
use crate::observability::{
    log_event_with_fields, Event, Logger, MetricsRegistry, MetricsSnapshot, Severity,
};

/// State shared by a group and all of its index handles.
pub(crate) struct Shared<T: 'static> {
    id: Uuid,
    default_degree: usize,
    pub(crate) metrics: MetricsRegistry,
    trees: RwLock<Vec<IndexTree<T>>>,
}

impl<T: 'static> Shared<T> {
    /// Acquire the shared lock, recovering from poisoning
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Vec<IndexTree<T>>> {
        self.trees.read().unwrap_or_else(|poisoned| {
            self.recover();
            poisoned.into_inner()
        })
    }

    /// Acquire the exclusive lock, recovering from poisoning
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Vec<IndexTree<T>>> {
        self.trees.write().unwrap_or_else(|poisoned| {
            self.recover();
            poisoned.into_inner()
        })
    }

    fn recover(&self) {
        self.trees.clear_poison();
        self.metrics.increment_lock_poisonings();
        let group = self.id.to_string();
        log_event_with_fields(Event::LockPoisoned, &[("group", group.as_str())]);
    }
}

/// A set of indexes over records of type `T`, kept consistent as one unit.
///
/// Register indexes with [`Group::index`] before inserting records, then
/// write through the group and read through the returned [`Index`] handles.
/// Clones share the same records and lock.
///
/// Records are held as `Arc<T>`. Fields read by any index predicate must not
/// change while the record is in the group: delete it, change it, and insert
/// it again.
pub struct Group<T: 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: 'static> Group<T> {
    /// Creates an empty group with default configuration
    pub fn new() -> Self {
        Self::with_config(&RecmgrConfig::default())
    }

    /// Creates an empty group
    pub fn with_config(config: &RecmgrConfig) -> Self {
        let shared = Shared {
            id: Uuid::new_v4(),
            default_degree: config.default_degree,
            metrics: MetricsRegistry::new(),
            trees: RwLock::new(Vec::new()),
        };

        let (group, default_degree) = (shared.id.to_string(), shared.default_degree.to_string());
        log_event_with_fields(
            Event::GroupCreated,
            &[("default_degree", default_degree.as_str()), ("group", group.as_str())],
        );

        Self {
            shared: Arc::new(shared),
        }
    }

    /// Identifier used to correlate this group's log lines
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Registers a new index ordered by `less`.
    ///
    /// `less(a, b)` must return true when `a` sorts strictly before `b`.
    /// `degree` is the tree fan-out and must be at least 2.
    ///
    /// Call this for every index before the first `replace_or_insert`; an
    /// index added later does not see records already in the group.
    pub fn index<F>(&self, degree: usize, less: F) -> IndexResult<Index<T>>
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        let tree = IndexTree::new(degree, Arc::new(less))?;

        let (slot, late) = {
            let mut trees = self.shared.write();
            let late = trees.iter().any(|tree| !tree.is_empty());
            trees.push(tree);
            (trees.len() - 1, late)
        };

        self.shared.metrics.increment_indexes();
        let event = if late {
            Event::IndexRegisteredLate
        } else {
            Event::IndexRegistered
        };
        let (group, degree, slot_str) = (self.id().to_string(), degree.to_string(), slot.to_string());
        log_event_with_fields(
            event,
            &[
                ("degree", degree.as_str()),
                ("group", group.as_str()),
                ("slot", slot_str.as_str()),
            ],
        );

        Ok(Index::new(Arc::clone(&self.shared), slot))
    }

    /// Registers a new index using the configured default degree
    pub fn index_with_default<F>(&self, less: F) -> IndexResult<Index<T>>
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.index(self.shared.default_degree, less)
    }

    /// Number of registered indexes
    pub fn index_count(&self) -> usize {
        self.shared.read().len()
    }

    /// Inserts `record` into every index, replacing entries that compare
    /// equal. Does nothing for `None`.
    pub fn replace_or_insert(&self, record: impl Into<Option<Arc<T>>>) {
        let Some(record) = record.into() else {
            return;
        };

        // Replaced records are dropped after the lock is released.
        let replaced: Vec<Arc<T>> = {
            let mut trees = self.shared.write();
            trees
                .iter_mut()
                .filter_map(|tree| tree.replace_or_insert(Arc::clone(&record)))
                .collect()
        };

        self.shared.metrics.increment_writes();
        if Logger::enabled(Severity::Trace) {
            let (group, replaced) = (self.id().to_string(), replaced.len().to_string());
            log_event_with_fields(
                Event::RecordWrite,
                &[("group", group.as_str()), ("replaced", replaced.as_str())],
            );
        }
    }

    /// Removes `record` from every index and returns how many indexes held
    /// a matching entry. Returns 0 for `None`.
    ///
    /// Every field read by every index predicate must be set in `record`;
    /// passing the result of an [`Index::get`] satisfies this.
    pub fn delete<'r>(&self, record: impl Into<Option<&'r T>>) -> usize {
        let Some(record) = record.into() else {
            return 0;
        };

        let removed: Vec<Arc<T>> = {
            let mut trees = self.shared.write();
            trees
                .iter_mut()
                .filter_map(|tree| tree.delete(record))
                .collect()
        };

        let count = removed.len();
        drop(removed);

        self.shared.metrics.record_delete(count);
        if Logger::enabled(Severity::Trace) {
            let (group, removed) = (self.id().to_string(), count.to_string());
            log_event_with_fields(
                Event::RecordDelete,
                &[("group", group.as_str()), ("removed", removed.as_str())],
            );
        }

        count
    }

    /// Returns how many indexes hold an entry matching `record`.
    /// Returns 0 for `None`.
    ///
    /// Same key-field requirement as [`Group::delete`].
    pub fn has<'r>(&self, record: impl Into<Option<&'r T>>) -> usize {
        let Some(record) = record.into() else {
            return 0;
        };

        let trees = self.shared.write();
        trees.iter().filter(|tree| tree.has(record)).count()
    }

    /// Snapshot of this group's counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

impl<T: 'static> Default for Group<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Clone for Group<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: 'static> fmt::Debug for Group<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group").field("id", &self.shared.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexError;

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        name: String,
        num: i32,
    }

    fn person(name: &str, num: i32) -> Arc<Person> {
        Arc::new(Person {
            name: name.to_string(),
            num,
        })
    }

    fn two_index_group() -> (Group<Person>, Index<Person>, Index<Person>) {
        let group = Group::new();
        let by_name = group.index(4, |a: &Person, b: &Person| a.name < b.name).unwrap();
        let by_num = group.index(4, |a: &Person, b: &Person| a.num < b.num).unwrap();
        (group, by_name, by_num)
    }

    #[test]
    fn test_invalid_degree_not_registered() {
        let group: Group<Person> = Group::new();
        let err = group.index(1, |a: &Person, b: &Person| a.num < b.num).unwrap_err();
        assert_eq!(err, IndexError::InvalidDegree { degree: 1 });
        assert_eq!(group.index_count(), 0);
    }

    #[test]
    fn test_insert_reaches_every_index() {
        let (group, by_name, by_num) = two_index_group();
        let athos = person("Athos", 1);

        group.replace_or_insert(Arc::clone(&athos));

        assert_eq!(group.has(&*athos), 2);
        assert!(by_name.has(&Person { name: "Athos".into(), ..Default::default() }));
        assert!(by_num.has(&Person { num: 1, ..Default::default() }));
    }

    #[test]
    fn test_absent_record_is_noop() {
        let (group, by_name, _) = two_index_group();
        group.replace_or_insert(person("Athos", 1));

        group.replace_or_insert(None);
        assert_eq!(group.delete(None), 0);
        assert_eq!(group.has(None), 0);
        assert_eq!(by_name.len(), 1);
    }

    #[test]
    fn test_delete_counts_matching_indexes() {
        let (group, _, by_num) = two_index_group();
        let porthos = person("Porthos", 2);
        group.replace_or_insert(Arc::clone(&porthos));

        assert_eq!(group.delete(&*porthos), 2);
        assert_eq!(group.delete(&*porthos), 0);
        assert!(by_num.is_empty());
    }

    #[test]
    fn test_delete_with_partial_key() {
        let (group, by_name, by_num) = two_index_group();
        group.replace_or_insert(person("Aramis", 3));

        // Only the number key is set, so the name index cannot match.
        let partial = Person { num: 3, ..Default::default() };
        assert_eq!(group.delete(&partial), 1);
        assert_eq!(by_num.len(), 0);
        assert_eq!(by_name.len(), 1);
    }

    #[test]
    fn test_replace_keeps_single_entry() {
        let (group, by_name, by_num) = two_index_group();
        group.replace_or_insert(person("Athos", 1));
        let renumbered = person("Athos", 1);
        group.replace_or_insert(Arc::clone(&renumbered));

        assert_eq!(by_name.len(), 1);
        let current = by_num.get(&Person { num: 1, ..Default::default() }).unwrap();
        assert!(Arc::ptr_eq(&current, &renumbered));
    }

    #[test]
    fn test_late_index_starts_empty() {
        let group = Group::new();
        group.index(4, |a: &Person, b: &Person| a.name < b.name).unwrap();
        group.replace_or_insert(person("Athos", 1));

        let late = group.index(4, |a: &Person, b: &Person| a.num < b.num).unwrap();
        assert_eq!(late.len(), 0);
        assert_eq!(group.index_count(), 2);
    }

    #[test]
    fn test_index_with_default_degree() {
        let config = RecmgrConfig {
            default_degree: 6,
            ..Default::default()
        };
        let group: Group<Person> = Group::with_config(&config);
        let idx = group.index_with_default(|a: &Person, b: &Person| a.num < b.num).unwrap();
        assert_eq!(idx.degree(), 6);
    }

    #[test]
    fn test_metrics_track_writes() {
        let (group, by_name, _) = two_index_group();
        let athos = person("Athos", 1);
        group.replace_or_insert(Arc::clone(&athos));
        group.delete(&*athos);
        by_name.get(&*athos);

        let metrics = group.metrics();
        assert_eq!(metrics.indexes_registered, 2);
        assert_eq!(metrics.writes, 1);
        assert_eq!(metrics.deletes, 1);
        assert_eq!(metrics.keys_removed, 2);
        assert_eq!(metrics.lookups, 1);
    }

    #[test]
    fn test_panicking_predicate_recovers_lock() {
        use std::panic::{self, AssertUnwindSafe};

        const BAD_NUM: i32 = -1;

        let group = Group::new();
        let by_name = group.index(4, |a: &Person, b: &Person| a.name < b.name).unwrap();
        let by_num = group
            .index(4, |a: &Person, b: &Person| {
                if a.num == BAD_NUM || b.num == BAD_NUM {
                    panic!("unorderable record");
                }
                a.num < b.num
            })
            .unwrap();
        group.replace_or_insert(person("Athos", 1));

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            group.replace_or_insert(person("Mordaunt", BAD_NUM));
        }));
        assert!(result.is_err());

        // The next write takes the poisoned lock and clears it.
        group.replace_or_insert(person("Porthos", 2));
        assert_eq!(group.metrics().lock_poisonings, 1);
        assert_eq!(by_num.len(), 2);
        assert_eq!(by_name.len(), 3);

        group.replace_or_insert(person("Aramis", 3));
        assert_eq!(group.metrics().lock_poisonings, 1);
        assert_eq!(by_num.len(), 3);
    }

    #[test]
    fn test_clone_shares_state() {
        let (group, by_name, _) = two_index_group();
        let other = group.clone();
        other.replace_or_insert(person("Athos", 1));

        assert_eq!(by_name.len(), 1);
        assert_eq!(group.id(), other.id());
    }
}
