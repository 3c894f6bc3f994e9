//! Predicate-ordered tree backing a single index
//!
//! `IndexTree` stores record references in a `BTreeSet` whose element order is
//! defined by a caller-supplied `less` predicate rather than by `Ord` on the
//! record type. Each element is an `Entry` pairing the predicate with the
//! record; `Entry`'s `Ord` implementation is the only place the predicate is
//! invoked.
//!
//! Lookups take a probe record in which only the fields the predicate reads
//! need to be meaningful.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

use super::errors::{IndexError, IndexResult};

/// Smallest degree accepted by `IndexTree::new`
pub const MIN_DEGREE: usize = 2;

/// Comparison predicate: returns true if `a` sorts strictly before `b`.
pub type LessFn<T> = dyn Fn(&T, &T) -> bool + Send + Sync;

/// Record reference held by an entry.
enum Slot<'a, T> {
    /// Record owned by the tree
    Stored(Arc<T>),
    /// Caller key used only for the duration of a lookup
    Probe(&'a T),
}

/// Tree element: a record reference ordered by its index's predicate.
pub(crate) struct Entry<'a, T> {
    less: Arc<LessFn<T>>,
    slot: Slot<'a, T>,
}

impl<T> Entry<'_, T> {
    fn record(&self) -> &T {
        match &self.slot {
            Slot::Stored(record) => record,
            Slot::Probe(record) => record,
        }
    }

    fn stored(&self) -> Option<&Arc<T>> {
        match &self.slot {
            Slot::Stored(record) => Some(record),
            Slot::Probe(_) => None,
        }
    }

    fn into_stored(self) -> Option<Arc<T>> {
        match self.slot {
            Slot::Stored(record) => Some(record),
            Slot::Probe(_) => None,
        }
    }
}

impl<T> Ord for Entry<'_, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.record(), other.record());
        if (self.less)(a, b) {
            Ordering::Less
        } else if (self.less)(b, a) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

impl<T> PartialOrd for Entry<'_, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for Entry<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<'_, T> {}

/// An ordered collection of record references for one index.
///
/// The tree holds shared references only; records are never cloned.
pub struct IndexTree<T: 'static> {
    /// Requested fan-out, validated at construction
    degree: usize,
    less: Arc<LessFn<T>>,
    entries: BTreeSet<Entry<'static, T>>,
}

impl<T: 'static> IndexTree<T> {
    /// Creates an empty tree ordered by `less`.
    ///
    /// Fails if `degree` is below `MIN_DEGREE`.
    pub fn new(degree: usize, less: Arc<LessFn<T>>) -> IndexResult<Self> {
        if degree < MIN_DEGREE {
            return Err(IndexError::InvalidDegree { degree });
        }

        Ok(Self {
            degree,
            less,
            entries: BTreeSet::new(),
        })
    }

    /// Returns the degree this tree was created with
    pub fn degree(&self) -> usize {
        self.degree
    }

    // Shared borrows of the set are covariant in the entry lifetime, so
    // stored entries can be compared against short-lived probes.
    fn view<'a>(&'a self) -> &'a BTreeSet<Entry<'a, T>> {
        &self.entries
    }

    fn probe<'a>(&self, key: &'a T) -> Entry<'a, T> {
        Entry {
            less: Arc::clone(&self.less),
            slot: Slot::Probe(key),
        }
    }

    fn entry(&self, record: Arc<T>) -> Entry<'static, T> {
        Entry {
            less: Arc::clone(&self.less),
            slot: Slot::Stored(record),
        }
    }

    /// Inserts `record`, replacing an entry the predicate deems equal.
    ///
    /// Returns the replaced record, if any.
    pub fn replace_or_insert(&mut self, record: Arc<T>) -> Option<Arc<T>> {
        let entry = self.entry(record);
        self.entries.replace(entry).and_then(Entry::into_stored)
    }

    /// Removes the entry equal to `key`.
    ///
    /// Returns the removed record, if any.
    pub fn delete(&mut self, key: &T) -> Option<Arc<T>> {
        let found = self.get(key)?;
        let entry = self.entry(found);
        self.entries.take(&entry).and_then(Entry::into_stored)
    }

    /// Returns the record equal to `key`
    pub fn get(&self, key: &T) -> Option<Arc<T>> {
        let probe = self.probe(key);
        self.view().get(&probe).and_then(Entry::stored).cloned()
    }

    /// Returns true if a record equal to `key` is present
    pub fn has(&self, key: &T) -> bool {
        let probe = self.probe(key);
        self.view().contains(&probe)
    }

    /// Returns the number of records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the tree holds no records
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the smallest record
    pub fn first(&self) -> Option<Arc<T>> {
        self.entries.first().and_then(Entry::stored).cloned()
    }

    /// Returns the largest record
    pub fn last(&self) -> Option<Arc<T>> {
        self.entries.last().and_then(Entry::stored).cloned()
    }

    /// Visits every record, [first, last], until `visit` returns false.
    pub fn ascend<F>(&self, visit: F)
    where
        F: FnMut(&Arc<T>) -> bool,
    {
        walk(self.entries.iter(), visit);
    }

    /// Visits records in [first, bound) until `visit` returns false.
    pub fn ascend_less_than<F>(&self, bound: &T, visit: F)
    where
        F: FnMut(&Arc<T>) -> bool,
    {
        let upper = self.probe(bound);
        walk(self.view().range((Bound::Unbounded, Bound::Excluded(upper))), visit);
    }

    /// Visits records in [bound, last] until `visit` returns false.
    pub fn ascend_greater_or_equal<F>(&self, bound: &T, visit: F)
    where
        F: FnMut(&Arc<T>) -> bool,
    {
        let lower = self.probe(bound);
        walk(self.view().range((Bound::Included(lower), Bound::Unbounded)), visit);
    }

    /// Visits records in [lo, hi) until `visit` returns false.
    ///
    /// Visits nothing when `hi` sorts before `lo`.
    pub fn ascend_range<F>(&self, lo: &T, hi: &T, visit: F)
    where
        F: FnMut(&Arc<T>) -> bool,
    {
        // BTreeSet::range panics on inverted bounds
        if (self.less)(hi, lo) {
            return;
        }

        let (lower, upper) = (self.probe(lo), self.probe(hi));
        walk(
            self.view().range((Bound::Included(lower), Bound::Excluded(upper))),
            visit,
        );
    }
}

fn walk<'s, 'p: 's, T: 'p, I, F>(entries: I, mut visit: F)
where
    I: Iterator<Item = &'s Entry<'p, T>>,
    F: FnMut(&Arc<T>) -> bool,
{
    for record in entries.filter_map(Entry::stored) {
        if !visit(record) {
            break;
        }
    }
}

impl<T: 'static> fmt::Debug for IndexTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexTree")
            .field("degree", &self.degree)
            .field("len", &self.entries.len())
            .finish()
    }
}
