use core::fmt;

use crate::raw::{EntryFormatter, RawRBTree};

/// A diagnostic dump of a collection's tree shape.
///
/// This `struct` is created by the `structure` method on [`RBTreeMap`], [`RBTreeSet`] and
/// [`RBTreeMultiSet`]. Its [`Display`](fmt::Display) output lists the nodes in pre-order: an
/// `N` header line, then one line per node with its color (`R:` or `B:`) and entry, and an `N`
/// line for every empty child slot. It is meant for debugging and tests and is not a stable
/// serialization format.
///
/// # Examples
///
/// ```
/// use rb_collections::RBTreeSet;
///
/// let set = RBTreeSet::from([2, 1, 3]);
/// let dump = set.structure().to_string();
/// assert!(dump.starts_with("N\n├──B:2\n"));
/// ```
///
/// [`RBTreeMap`]: crate::RBTreeMap
/// [`RBTreeSet`]: crate::RBTreeSet
/// [`RBTreeMultiSet`]: crate::RBTreeMultiSet
#[must_use]
pub struct Structure<'a, K, V> {
    tree: &'a RawRBTree<K, V>,
    entry: EntryFormatter<K, V>,
}

impl<'a, K, V> Structure<'a, K, V> {
    pub(crate) fn new(tree: &'a RawRBTree<K, V>, entry: EntryFormatter<K, V>) -> Self {
        Self { tree, entry }
    }
}

impl<K, V> fmt::Display for Structure<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tree.write_structure(f, self.entry)
    }
}

impl<K, V> fmt::Debug for Structure<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
