//! Bidirectional cursors over the collections in this crate.
//!
//! A cursor points either at an entry or at the end position, which sits between the last and
//! the first entry. Moving forward from the last entry reaches the end position, and moving
//! forward again wraps around to the first entry; moving backward mirrors this.

use core::fmt;
use core::ptr;

use crate::raw::{Handle, RawRBTree};

/// A read-only cursor over the entries of a collection.
///
/// This `struct` is returned by lookup methods such as [`RBTreeMap::find`],
/// [`RBTreeMap::lower_bound`] and [`RBTreeMap::cursor_front`]. Absent results are reported as
/// a cursor at the end position rather than an error.
///
/// Two cursors are equal when they point into the same collection at the same position.
///
/// # Examples
///
/// ```
/// use rb_collections::RBTreeMap;
///
/// let map = RBTreeMap::from([(1, "a"), (2, "b")]);
/// let mut cursor = map.cursor_front();
/// assert_eq!(cursor.key_value(), Some((&1, &"a")));
/// cursor.move_next();
/// assert_eq!(cursor.key(), Some(&2));
/// cursor.move_next();
/// assert!(cursor.is_end());
/// assert_eq!(cursor, map.cursor_end());
/// cursor.move_prev();
/// assert_eq!(cursor.value(), Some(&"b"));
/// ```
///
/// [`RBTreeMap::find`]: crate::RBTreeMap::find
/// [`RBTreeMap::lower_bound`]: crate::RBTreeMap::lower_bound
/// [`RBTreeMap::cursor_front`]: crate::RBTreeMap::cursor_front
pub struct Cursor<'a, K, V> {
    tree: &'a RawRBTree<K, V>,
    current: Handle,
}

impl<'a, K, V> Cursor<'a, K, V> {
    pub(crate) const fn new(tree: &'a RawRBTree<K, V>, current: Handle) -> Self {
        Self { tree, current }
    }

    /// Returns `true` if the cursor is at the end position.
    #[must_use]
    pub const fn is_end(&self) -> bool {
        self.current.is_nil()
    }

    /// Returns the key at the cursor, or `None` at the end position.
    #[must_use]
    pub fn key(&self) -> Option<&'a K> {
        (!self.is_end()).then(|| self.tree.key(self.current))
    }

    /// Returns the value at the cursor, or `None` at the end position.
    #[must_use]
    pub fn value(&self) -> Option<&'a V> {
        (!self.is_end()).then(|| self.tree.value(self.current))
    }

    /// Returns the entry at the cursor, or `None` at the end position.
    #[must_use]
    pub fn key_value(&self) -> Option<(&'a K, &'a V)> {
        (!self.is_end()).then(|| self.tree.key_value(self.current))
    }

    /// Moves to the next entry in key order.
    ///
    /// From the last entry this reaches the end position; from the end position it wraps to
    /// the first entry.
    ///
    /// # Complexity
    ///
    /// O(log n) worst case, amortized O(1) over a full traversal.
    pub fn move_next(&mut self) {
        self.current = self.tree.successor(self.current);
    }

    /// Moves to the previous entry in key order.
    ///
    /// From the first entry this reaches the end position; from the end position it wraps to
    /// the last entry.
    ///
    /// # Complexity
    ///
    /// O(log n) worst case, amortized O(1) over a full traversal.
    pub fn move_prev(&mut self) {
        self.current = self.tree.predecessor(self.current);
    }
}

impl<K, V> Clone for Cursor<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Cursor<'_, K, V> {}

impl<K, V> PartialEq for Cursor<'_, K, V> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.tree, other.tree) && self.current == other.current
    }
}

impl<K, V> Eq for Cursor<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Cursor<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.key_value()).finish()
    }
}

/// A cursor over the entries of a collection that can change values and remove entries.
///
/// Keys are never handed out mutably, so the ordering of the collection cannot be broken
/// through a `CursorMut`.
///
/// # Examples
///
/// ```
/// use rb_collections::RBTreeMap;
///
/// let mut map = RBTreeMap::from([(1, 10), (2, 20), (3, 30)]);
/// let mut cursor = map.find_mut(&2);
/// if let Some(value) = cursor.value_mut() {
///     *value += 1;
/// }
/// assert_eq!(cursor.remove_current(), Some((2, 21)));
/// assert_eq!(cursor.key(), Some(&3));
/// assert_eq!(map.len(), 2);
/// ```
pub struct CursorMut<'a, K, V> {
    tree: &'a mut RawRBTree<K, V>,
    current: Handle,
}

impl<'a, K, V> CursorMut<'a, K, V> {
    pub(crate) const fn new(tree: &'a mut RawRBTree<K, V>, current: Handle) -> Self {
        Self { tree, current }
    }

    /// Returns `true` if the cursor is at the end position.
    #[must_use]
    pub const fn is_end(&self) -> bool {
        self.current.is_nil()
    }

    /// Returns the key at the cursor, or `None` at the end position.
    #[must_use]
    pub fn key(&self) -> Option<&K> {
        (!self.is_end()).then(|| self.tree.key(self.current))
    }

    /// Returns the value at the cursor, or `None` at the end position.
    #[must_use]
    pub fn value(&self) -> Option<&V> {
        (!self.is_end()).then(|| self.tree.value(self.current))
    }

    /// Returns the entry at the cursor, or `None` at the end position.
    #[must_use]
    pub fn key_value(&self) -> Option<(&K, &V)> {
        (!self.is_end()).then(|| self.tree.key_value(self.current))
    }

    /// Returns a mutable reference to the value at the cursor, or `None` at the end position.
    pub fn value_mut(&mut self) -> Option<&mut V> {
        if self.is_end() {
            None
        } else {
            Some(self.tree.value_mut(self.current))
        }
    }

    /// Returns the key and a mutable reference to the value at the cursor.
    pub fn key_value_mut(&mut self) -> Option<(&K, &mut V)> {
        if self.is_end() {
            None
        } else {
            Some(self.tree.key_value_mut(self.current))
        }
    }

    /// Converts the cursor into a mutable reference to its value with the collection's
    /// lifetime.
    #[must_use]
    pub fn into_value_mut(self) -> Option<&'a mut V> {
        let Self { tree, current } = self;
        if current.is_nil() {
            None
        } else {
            Some(tree.value_mut(current))
        }
    }

    /// Moves to the next entry in key order, wrapping through the end position.
    pub fn move_next(&mut self) {
        self.current = self.tree.successor(self.current);
    }

    /// Moves to the previous entry in key order, wrapping through the end position.
    pub fn move_prev(&mut self) {
        self.current = self.tree.predecessor(self.current);
    }

    /// Removes the entry at the cursor and returns it, leaving the cursor on the next entry.
    ///
    /// Returns `None` and does nothing at the end position. Only the removed entry is
    /// affected; every other entry stays where it is.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn remove_current(&mut self) -> Option<(K, V)> {
        if self.is_end() {
            return None;
        }
        let next = self.tree.successor(self.current);
        let entry = self.tree.erase(self.current);
        self.current = next;
        Some(entry)
    }

    /// Returns a read-only view of this cursor.
    #[must_use]
    pub fn as_cursor(&self) -> Cursor<'_, K, V> {
        Cursor::new(self.tree, self.current)
    }
}

impl<'a, K, V> From<CursorMut<'a, K, V>> for Cursor<'a, K, V> {
    fn from(cursor: CursorMut<'a, K, V>) -> Self {
        Cursor::new(cursor.tree, cursor.current)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for CursorMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CursorMut").field(&self.key_value()).finish()
    }
}
