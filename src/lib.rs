//! Red-black tree collections for Rust.
//!
//! This crate provides three ordered collections built on one balanced tree engine:
//!
//! - [`RBTreeMap`] - a map with unique keys
//! - [`RBTreeSet`] - a set of unique values
//! - [`RBTreeMultiSet`] - an ordered multiset, keeping equal values in insertion order
//!
//! Lookups hand out [`Cursor`]s, which walk the collection in both directions and wrap around
//! through an end position. Entries stay where they are while others are inserted or removed,
//! so a cursor only goes stale when its own entry is removed.
//!
//! # Example
//!
//! ```
//! use rb_collections::{RBTreeMap, RBTreeMultiSet};
//!
//! let mut stock = RBTreeMap::new();
//! stock.insert("pears", 4);
//! stock.insert("apples", 7);
//! // A second insert with an existing key keeps the stored value.
//! let (_, inserted) = stock.insert("pears", 9);
//! assert!(!inserted);
//! assert_eq!(stock.get(&"pears"), Some(&4));
//!
//! // Walk from the first key not less than "b".
//! let cursor = stock.lower_bound(&"b");
//! assert_eq!(cursor.key_value(), Some((&"pears", &4)));
//!
//! let mut rolls = RBTreeMultiSet::from([3, 1, 3, 3]);
//! assert_eq!(rolls.count(&3), 3);
//! assert_eq!(rolls.remove_all(&3), 3);
//! assert_eq!(rolls.len(), 1);
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Stable positions** - Removing an entry never moves another entry's key or value
//! - **Familiar API** - Map and set surfaces mirror `std::collections::BTreeMap`/`BTreeSet`
//!
//! # Implementation
//!
//! Nodes live in a slot arena and refer to each other through compact handles. A single shared
//! sentinel stands in for every absent child and for the root's parent, and is also the end
//! position seen by cursors. Rebalancing after insertion and removal uses trinode restructuring
//! and recoloring, keeping every path from the root to a leaf within twice the length of any
//! other.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
// NOTE: Unsafe code is limited to the raw-pointer paths behind `Iter` and `IterMut`, which read
// node links while handing out references into the value arena.
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod error;
mod raw;
mod structure;

pub mod cursor;
pub mod rbtree_map;
pub mod rbtree_multiset;
pub mod rbtree_set;

pub use cursor::{Cursor, CursorMut};
pub use error::Error;
pub use rbtree_map::RBTreeMap;
pub use rbtree_multiset::RBTreeMultiSet;
pub use rbtree_set::RBTreeSet;
pub use structure::Structure;
