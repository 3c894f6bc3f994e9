//! Index handles: ordered reads over one member of a group
//!
//! Reads hold the group's shared lock only while the tree is consulted.
//! Traversals copy the matching record references out first and run the
//! visitor afterwards, with no lock held, so a visitor may call back into
//! the group (for example to delete the record it is visiting). The visitor
//! therefore sees the index as it was when the traversal started.

use std::fmt;
use std::sync::Arc;

use super::btree::IndexTree;
use super::group::Shared;

/// Read access to one index of a [`Group`](super::Group).
///
/// Handles are cheap to clone and may be sent across threads when `T` is
/// `Send + Sync`.
///
/// Key arguments only need the fields inspected by this index's predicate;
/// other fields are ignored.
pub struct Index<T: 'static> {
    shared: Arc<Shared<T>>,
    slot: usize,
}

impl<T: 'static> Index<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>, slot: usize) -> Self {
        Self { shared, slot }
    }

    fn read<R>(&self, op: impl FnOnce(&IndexTree<T>) -> R) -> R {
        let trees = self.shared.read();
        op(&trees[self.slot])
    }

    fn snapshot(&self, fill: impl FnOnce(&IndexTree<T>, &mut Vec<Arc<T>>)) -> Vec<Arc<T>> {
        self.shared.metrics.increment_traversals();
        let mut list = Vec::new();
        self.read(|tree| fill(tree, &mut list));
        list
    }

    /// Returns the record equal to `key`, if present
    pub fn get(&self, key: &T) -> Option<Arc<T>> {
        self.shared.metrics.increment_lookups();
        self.read(|tree| tree.get(key))
    }

    /// Returns true if a record equal to `key` is present
    pub fn has(&self, key: &T) -> bool {
        self.shared.metrics.increment_lookups();
        self.read(|tree| tree.has(key))
    }

    /// Number of records in this index
    pub fn len(&self) -> usize {
        self.read(IndexTree::len)
    }

    /// Returns true if this index holds no records
    pub fn is_empty(&self) -> bool {
        self.read(IndexTree::is_empty)
    }

    /// Smallest record in this index's order
    pub fn first(&self) -> Option<Arc<T>> {
        self.read(IndexTree::first)
    }

    /// Largest record in this index's order
    pub fn last(&self) -> Option<Arc<T>> {
        self.read(IndexTree::last)
    }

    /// Degree the index was registered with
    pub fn degree(&self) -> usize {
        self.read(IndexTree::degree)
    }

    /// Every record, [first, last], in index order.
    pub fn ascend_list(&self) -> Vec<Arc<T>> {
        self.snapshot(|tree, list| {
            list.reserve(tree.len());
            tree.ascend(push_into(list));
        })
    }

    /// Records in [first, bound).
    pub fn ascend_less_than_list(&self, bound: &T) -> Vec<Arc<T>> {
        self.snapshot(|tree, list| tree.ascend_less_than(bound, push_into(list)))
    }

    /// Records in [bound, last].
    pub fn ascend_greater_or_equal_list(&self, bound: &T) -> Vec<Arc<T>> {
        self.snapshot(|tree, list| tree.ascend_greater_or_equal(bound, push_into(list)))
    }

    /// Records in [lo, hi). Empty when `hi` sorts before `lo`.
    pub fn ascend_range_list(&self, lo: &T, hi: &T) -> Vec<Arc<T>> {
        self.snapshot(|tree, list| tree.ascend_range(lo, hi, push_into(list)))
    }

    /// Calls `visit` for every record in index order until it returns false.
    pub fn ascend<F>(&self, visit: F)
    where
        F: FnMut(&Arc<T>) -> bool,
    {
        traverse(self.ascend_list(), visit);
    }

    /// Calls `visit` for records in [first, bound) until it returns false.
    pub fn ascend_less_than<F>(&self, bound: &T, visit: F)
    where
        F: FnMut(&Arc<T>) -> bool,
    {
        traverse(self.ascend_less_than_list(bound), visit);
    }

    /// Calls `visit` for records in [bound, last] until it returns false.
    pub fn ascend_greater_or_equal<F>(&self, bound: &T, visit: F)
    where
        F: FnMut(&Arc<T>) -> bool,
    {
        traverse(self.ascend_greater_or_equal_list(bound), visit);
    }

    /// Calls `visit` for records in [lo, hi) until it returns false.
    pub fn ascend_range<F>(&self, lo: &T, hi: &T, visit: F)
    where
        F: FnMut(&Arc<T>) -> bool,
    {
        traverse(self.ascend_range_list(lo, hi), visit);
    }
}

fn push_into<T>(list: &mut Vec<Arc<T>>) -> impl FnMut(&Arc<T>) -> bool + '_ {
    move |record| {
        list.push(Arc::clone(record));
        true
    }
}

fn traverse<T, F>(list: Vec<Arc<T>>, mut visit: F)
where
    F: FnMut(&Arc<T>) -> bool,
{
    for record in &list {
        if !visit(record) {
            return;
        }
    }
}

impl<T: 'static> Clone for Index<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            slot: self.slot,
        }
    }
}

impl<T: 'static> fmt::Debug for Index<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index").field("slot", &self.slot).finish()
    }
}
