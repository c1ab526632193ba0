use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;

use crate::cursor::{Cursor, CursorMut};
use crate::raw::{Handle, RawRBTree};
use crate::rbtree_map::{IntoKeys, Keys};
use crate::structure::Structure;

/// An ordered multiset based on a red-black tree.
///
/// Unlike [`RBTreeSet`](crate::RBTreeSet), equal values may occur any number of times. Equal
/// values are kept next to each other in the order they were inserted.
///
/// See [`RBTreeMap`](crate::RBTreeMap)'s documentation for a discussion of the logic errors that
/// arise from mutating an element's ordering while it is stored.
///
/// # Examples
///
/// ```
/// use rb_collections::RBTreeMultiSet;
///
/// let mut rolls = RBTreeMultiSet::from([4, 1, 4, 6, 1, 4]);
/// assert_eq!(rolls.len(), 6);
/// assert_eq!(rolls.count(&4), 3);
///
/// // Drop one of the fours, then every one.
/// assert!(rolls.remove(&4));
/// assert_eq!(rolls.count(&4), 2);
/// assert_eq!(rolls.remove_all(&4), 2);
///
/// assert_eq!(rolls.iter().copied().collect::<Vec<_>>(), [1, 1, 6]);
/// ```
pub struct RBTreeMultiSet<T> {
    raw: RawRBTree<T, ()>,
}

/// An iterator over the items of a `RBTreeMultiSet`.
///
/// This `struct` is created by the [`iter`] method on [`RBTreeMultiSet`].
///
/// [`iter`]: RBTreeMultiSet::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, T: 'a> {
    inner: Keys<'a, T, ()>,
}

/// An owning iterator over the items of a `RBTreeMultiSet` in ascending order.
pub struct IntoIter<T> {
    inner: IntoKeys<T, ()>,
}

impl<T> RBTreeMultiSet<T> {
    /// Makes a new, empty `RBTreeMultiSet`.
    #[must_use]
    pub const fn new() -> RBTreeMultiSet<T> {
        RBTreeMultiSet { raw: RawRBTree::new() }
    }

    /// Makes a new, empty `RBTreeMultiSet` with room for at least `capacity` values.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> RBTreeMultiSet<T> {
        RBTreeMultiSet {
            raw: RawRBTree::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Returns the number of elements, counting every duplicate.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the largest number of values any `RBTreeMultiSet` can hold.
    #[must_use]
    pub const fn max_len() -> usize {
        RawRBTree::<T, ()>::max_len()
    }

    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Swaps the contents of two multisets.
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(&mut self.raw, &mut other.raw);
    }

    /// Returns the smallest element, if any. Among equal elements this is the one inserted first.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.cursor_front().key()
    }

    /// Returns the largest element, if any. Among equal elements this is the one inserted last.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.cursor_back().key()
    }

    pub fn pop_first(&mut self) -> Option<T> {
        self.raw.pop_first().map(|kv| kv.0)
    }

    pub fn pop_last(&mut self) -> Option<T> {
        self.raw.pop_last().map(|kv| kv.0)
    }

    pub fn cursor_front(&self) -> Cursor<'_, T, ()> {
        Cursor::new(&self.raw, self.raw.first())
    }

    pub fn cursor_back(&self) -> Cursor<'_, T, ()> {
        Cursor::new(&self.raw, self.raw.last())
    }

    pub fn cursor_end(&self) -> Cursor<'_, T, ()> {
        Cursor::new(&self.raw, Handle::NIL)
    }

    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, T, ()> {
        let first = self.raw.first();
        CursorMut::new(&mut self.raw, first)
    }

    /// Gets an iterator that visits every element, duplicates included, in ascending order.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMultiSet;
    ///
    /// let set = RBTreeMultiSet::from([2, 1, 2]);
    /// assert_eq!(set.iter().collect::<Vec<_>>(), [&1, &2, &2]);
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: Keys::new(&self.raw),
        }
    }

    /// Returns a diagnostic dump of the tree behind the multiset.
    pub fn structure(&self) -> Structure<'_, T, ()>
    where
        T: fmt::Display,
    {
        Structure::new(&self.raw, |key, _, f| write!(f, "{key}"))
    }
}

impl<T: Ord> RBTreeMultiSet<T> {
    /// Returns `true` if at least one element equals `value`.
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        !self.raw.find(value).is_nil()
    }

    /// Returns some element equal to `value`, if any.
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.find(value).key()
    }

    /// Returns a cursor at some element equal to `value`, or at the end position.
    ///
    /// Which of several equal elements is found is unspecified; use [`lower_bound`] for the
    /// first one.
    ///
    /// [`lower_bound`]: RBTreeMultiSet::lower_bound
    pub fn find<Q>(&self, value: &Q) -> Cursor<'_, T, ()>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        Cursor::new(&self.raw, self.raw.find(value))
    }

    /// Returns a mutable cursor at some element equal to `value`, or at the end position.
    pub fn find_mut<Q>(&mut self, value: &Q) -> CursorMut<'_, T, ()>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.raw.find(value);
        CursorMut::new(&mut self.raw, handle)
    }

    /// Returns a cursor at the first element not less than `value`.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn lower_bound<Q>(&self, value: &Q) -> Cursor<'_, T, ()>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        Cursor::new(&self.raw, self.raw.lower_bound(value))
    }

    /// Returns a cursor at the first element greater than `value`.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn upper_bound<Q>(&self, value: &Q) -> Cursor<'_, T, ()>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        Cursor::new(&self.raw, self.raw.upper_bound(value))
    }

    /// Returns the cursors `(lower_bound(value), upper_bound(value))`, which bracket the run of
    /// elements equal to `value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMultiSet;
    ///
    /// let set = RBTreeMultiSet::from([1, 2, 2, 2, 3]);
    /// let (mut first, last) = set.equal_range(&2);
    /// let mut run = Vec::new();
    /// while first != last {
    ///     run.push(*first.key().unwrap());
    ///     first.move_next();
    /// }
    /// assert_eq!(run, [2, 2, 2]);
    /// assert_eq!(last.key(), Some(&3));
    /// ```
    pub fn equal_range<Q>(&self, value: &Q) -> (Cursor<'_, T, ()>, Cursor<'_, T, ()>)
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        (self.lower_bound(value), self.upper_bound(value))
    }

    /// Returns how many elements equal `value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMultiSet;
    ///
    /// let set = RBTreeMultiSet::from([1, 1, 1, 4, 4, 3]);
    /// assert_eq!(set.count(&1), 3);
    /// assert_eq!(set.count(&2), 0);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n + k) where k is the result.
    pub fn count<Q>(&self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.count(value)
    }

    /// Adds a value, after any elements equal to it, and returns a cursor at the new element.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMultiSet;
    ///
    /// let mut set = RBTreeMultiSet::new();
    /// set.insert(5);
    /// let cursor = set.insert(5);
    /// assert_eq!(cursor.key(), Some(&5));
    /// assert_eq!(set.len(), 2);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn insert(&mut self, value: T) -> Cursor<'_, T, ()> {
        let handle = self.raw.insert_multi(value, ());
        Cursor::new(&self.raw, handle)
    }

    /// Adds every value of `iter`; returns how many were added.
    pub fn insert_many<I>(&mut self, iter: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let before = self.len();
        self.extend(iter);
        self.len() - before
    }

    /// Removes one element equal to `value`. Returns whether one was present.
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.remove(value).is_some()
    }

    /// Removes and returns one element equal to `value`, if any.
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.remove(value).map(|kv| kv.0)
    }

    /// Removes every element equal to `value`; returns how many were removed.
    ///
    /// # Complexity
    ///
    /// O(k log n) where k is the result.
    pub fn remove_all<Q>(&mut self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.erase_all(value)
    }

    /// Moves every element of `other` into `self`, leaving `other` empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMultiSet;
    ///
    /// let mut a = RBTreeMultiSet::from([1, 2, 3, 3]);
    /// let mut b = RBTreeMultiSet::from([3, 4, 1]);
    /// a.merge(&mut b);
    /// assert_eq!(a.len(), 7);
    /// assert!(b.is_empty());
    /// ```
    pub fn merge(&mut self, other: &mut Self) {
        self.raw.merge_all(&mut other.raw);
    }
}

impl<T: Hash> Hash for RBTreeMultiSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for elt in self {
            elt.hash(state);
        }
    }
}

impl<T: PartialEq> PartialEq for RBTreeMultiSet<T> {
    fn eq(&self, other: &RBTreeMultiSet<T>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for RBTreeMultiSet<T> {}

impl<T: PartialOrd> PartialOrd for RBTreeMultiSet<T> {
    fn partial_cmp(&self, other: &RBTreeMultiSet<T>) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<T: Ord> Ord for RBTreeMultiSet<T> {
    fn cmp(&self, other: &RBTreeMultiSet<T>) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<T: Clone> Clone for RBTreeMultiSet<T> {
    fn clone(&self) -> Self {
        RBTreeMultiSet { raw: self.raw.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for RBTreeMultiSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> Default for RBTreeMultiSet<T> {
    fn default() -> RBTreeMultiSet<T> {
        RBTreeMultiSet::new()
    }
}

impl<T: Ord> FromIterator<T> for RBTreeMultiSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> RBTreeMultiSet<T> {
        let mut set = RBTreeMultiSet::new();
        set.extend(iter);
        set
    }
}

impl<T: Ord> Extend<T> for RBTreeMultiSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for elem in iter {
            self.raw.insert_multi(elem, ());
        }
    }
}

impl<'a, T: 'a + Ord + Copy> Extend<&'a T> for RBTreeMultiSet<T> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T: Ord, const N: usize> From<[T; N]> for RBTreeMultiSet<T> {
    fn from(arr: [T; N]) -> Self {
        arr.into_iter().collect()
    }
}

impl<T> IntoIterator for RBTreeMultiSet<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(mut self) -> IntoIter<T> {
        IntoIter {
            inner: IntoKeys::new(self.raw.drain_to_vec()),
        }
    }
}

impl<'a, T> IntoIterator for &'a RBTreeMultiSet<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        self.inner.next_back()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T: fmt::Debug> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Iter").field(&self.inner.clone()).finish()
    }
}

impl<T> Default for Iter<'_, T> {
    fn default() -> Self {
        Iter {
            inner: Keys::default(),
        }
    }
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<T> {
        self.inner.next_back()
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<T> FusedIterator for IntoIter<T> {}

impl<T: fmt::Debug> fmt::Debug for IntoIter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.inner).finish()
    }
}
