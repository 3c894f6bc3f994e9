//! Multi-index record groups
//!
//! A [`Group`] keeps several independently ordered indexes over the same set
//! of records. Writes go through the group and reach every index under one
//! lock; reads go through an [`Index`] handle and see only that index's
//! order.
//!
//! # Invariants
//!
//! - After a group write returns, every index agrees on whether the record
//!   is present
//! - Readers never observe a write applied to some indexes but not others
//! - Traversal visitors run without the group lock held
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use recmgr::index::Group;
//!
//! #[derive(Default)]
//! struct Composer {
//!     name: String,
//!     born: i32,
//! }
//!
//! let group = Group::new();
//! let by_name = group.index(4, |a: &Composer, b: &Composer| a.name < b.name).unwrap();
//! let by_born = group.index(4, |a: &Composer, b: &Composer| a.born < b.born).unwrap();
//!
//! group.replace_or_insert(Arc::new(Composer { name: "Bach".into(), born: 1685 }));
//! group.replace_or_insert(Arc::new(Composer { name: "Mozart".into(), born: 1756 }));
//!
//! let key = Composer { born: 1756, ..Default::default() };
//! let mozart = by_born.get(&key).unwrap();
//! assert_eq!(mozart.name, "Mozart");
//!
//! assert_eq!(group.delete(&*mozart), 2);
//! assert_eq!(by_name.len(), 1);
//! ```

mod btree;
mod errors;
mod group;
mod handle;

pub use btree::{IndexTree, LessFn, MIN_DEGREE};
pub use errors::{IndexError, IndexResult};
pub use group::Group;
pub use handle::Index;
