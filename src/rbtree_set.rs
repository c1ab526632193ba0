use alloc::vec::Vec;
use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;

use crate::RBTreeMap;
use crate::cursor::{Cursor, CursorMut};
use crate::rbtree_map::{IntoKeys, Keys};
use crate::structure::Structure;

/// An ordered set based on a red-black tree.
///
/// See [`RBTreeMap`]'s documentation for a detailed discussion of this collection's performance
/// benefits and drawbacks.
///
/// Values are unique: inserting a value equal to one already present leaves the stored value
/// in place. Use [`RBTreeMultiSet`](crate::RBTreeMultiSet) to keep duplicates.
///
/// It is a logic error for an item to be modified in such a way that the item's ordering relative
/// to any other item, as determined by the [`Ord`] trait, changes while it is in the set. This is
/// normally only possible through [`Cell`], [`RefCell`], global state, I/O, or unsafe code.
/// The behavior resulting from such a logic error is not specified, but will be encapsulated to the
/// `RBTreeSet` that observed the logic error and not result in undefined behavior.
///
/// Iterators returned by [`RBTreeSet::iter`] and [`RBTreeSet::into_iter`] produce their items in
/// order, and take worst-case logarithmic and amortized constant time per item returned.
///
/// [`Cell`]: core::cell::Cell
/// [`RefCell`]: core::cell::RefCell
///
/// # Examples
///
/// ```
/// use rb_collections::RBTreeSet;
///
/// let mut books = RBTreeSet::new();
///
/// // Add some books.
/// books.insert("A Dance With Dragons");
/// books.insert("To Kill a Mockingbird");
/// books.insert("The Odyssey");
/// books.insert("The Great Gatsby");
///
/// // Check for a specific one.
/// if !books.contains("The Winds of Winter") {
///     println!("We have {} books, but The Winds of Winter ain't one.",
///              books.len());
/// }
///
/// // Remove a book.
/// books.remove("The Odyssey");
///
/// // Iterate over everything.
/// for book in &books {
///     println!("{book}");
/// }
/// ```
///
/// A `RBTreeSet` with a known list of items can be initialized from an array:
///
/// ```
/// use rb_collections::RBTreeSet;
///
/// let set = RBTreeSet::from([1, 2, 3]);
/// ```
pub struct RBTreeSet<T> {
    map: RBTreeMap<T, ()>,
}

/// An iterator over the items of a `RBTreeSet`.
///
/// This `struct` is created by the [`iter`] method on [`RBTreeSet`].
/// See its documentation for more.
///
/// [`iter`]: RBTreeSet::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, T: 'a> {
    inner: Keys<'a, T, ()>,
}

/// An owning iterator over the items of a `RBTreeSet` in ascending order.
///
/// This `struct` is created by the [`into_iter`] method on [`RBTreeSet`]
/// (provided by the [`IntoIterator`] trait). See its documentation for more.
///
/// [`into_iter`]: RBTreeSet#method.into_iter
pub struct IntoIter<T> {
    inner: IntoKeys<T, ()>,
}

impl<T> RBTreeSet<T> {
    /// Makes a new, empty `RBTreeSet`.
    ///
    /// Does not allocate anything on its own.
    ///
    /// # Examples
    ///
    /// ```
    /// # #![allow(unused_mut)]
    /// use rb_collections::RBTreeSet;
    ///
    /// let mut set: RBTreeSet<i32> = RBTreeSet::new();
    /// ```
    #[must_use]
    pub const fn new() -> RBTreeSet<T> {
        RBTreeSet { map: RBTreeMap::new() }
    }

    /// Makes a new, empty `RBTreeSet` with room for at least `capacity` values.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> RBTreeSet<T> {
        RBTreeSet {
            map: RBTreeMap::with_capacity(capacity),
        }
    }

    /// Returns the number of values the set can hold without reallocating.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.map.capacity()
    }

    /// Returns the number of elements in the set.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeSet;
    ///
    /// let mut v = RBTreeSet::new();
    /// assert_eq!(v.len(), 0);
    /// v.insert(1);
    /// assert_eq!(v.len(), 1);
    /// ```
    #[must_use]
    pub const fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the set contains no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the largest number of values any `RBTreeSet` can hold.
    #[must_use]
    pub const fn max_len() -> usize {
        RBTreeMap::<T, ()>::max_len()
    }

    /// Clears the set, removing all elements.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeSet;
    ///
    /// let mut v = RBTreeSet::new();
    /// v.insert(1);
    /// v.clear();
    /// assert!(v.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Swaps the contents of two sets.
    pub fn swap(&mut self, other: &mut Self) {
        self.map.swap(&mut other.map);
    }

    /// Returns a reference to the first element in the set, if any.
    /// This element is always the minimum of all elements in the set.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeSet;
    ///
    /// let mut set = RBTreeSet::new();
    /// assert_eq!(set.first(), None);
    /// set.insert(1);
    /// assert_eq!(set.first(), Some(&1));
    /// set.insert(2);
    /// assert_eq!(set.first(), Some(&1));
    /// ```
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.map.first_key_value().map(|(k, _)| k)
    }

    /// Returns a reference to the last element in the set, if any.
    /// This element is always the maximum of all elements in the set.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.map.last_key_value().map(|(k, _)| k)
    }

    /// Removes the first element from the set and returns it, if any.
    /// The first element is always the minimum element in the set.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeSet;
    ///
    /// let mut set = RBTreeSet::new();
    ///
    /// set.insert(1);
    /// while let Some(n) = set.pop_first() {
    ///     assert_eq!(n, 1);
    /// }
    /// assert!(set.is_empty());
    /// ```
    pub fn pop_first(&mut self) -> Option<T> {
        self.map.pop_first().map(|kv| kv.0)
    }

    /// Removes the last element from the set and returns it, if any.
    /// The last element is always the maximum element in the set.
    pub fn pop_last(&mut self) -> Option<T> {
        self.map.pop_last().map(|kv| kv.0)
    }

    /// Returns a cursor at the first element, or at the end position if the set is empty.
    pub fn cursor_front(&self) -> Cursor<'_, T, ()> {
        self.map.cursor_front()
    }

    /// Returns a cursor at the last element, or at the end position if the set is empty.
    pub fn cursor_back(&self) -> Cursor<'_, T, ()> {
        self.map.cursor_back()
    }

    /// Returns a cursor at the end position.
    pub fn cursor_end(&self) -> Cursor<'_, T, ()> {
        self.map.cursor_end()
    }

    /// Returns a mutable cursor at the first element, able to remove elements as it goes.
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, T, ()> {
        self.map.cursor_front_mut()
    }

    /// Gets an iterator that visits the elements in the `RBTreeSet` in ascending order.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeSet;
    ///
    /// let set = RBTreeSet::from([3, 1, 2]);
    /// let mut set_iter = set.iter();
    /// assert_eq!(set_iter.next(), Some(&1));
    /// assert_eq!(set_iter.next(), Some(&2));
    /// assert_eq!(set_iter.next(), Some(&3));
    /// assert_eq!(set_iter.next(), None);
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { inner: self.map.keys() }
    }

    /// Returns a diagnostic dump of the tree behind the set.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeSet;
    ///
    /// let set = RBTreeSet::from([1, 2, 3]);
    /// let expected = "\
    /// N
    /// ├──B:2
    /// │   ├──R:1
    /// │   │   ├──N
    /// │   │   └──N
    /// │   └──R:3
    /// │       ├──N
    /// │       └──N
    /// ";
    /// assert_eq!(set.structure().to_string(), expected);
    /// ```
    pub fn structure(&self) -> Structure<'_, T, ()>
    where
        T: fmt::Display,
    {
        Structure::new(self.map.raw(), |key, _, f| write!(f, "{key}"))
    }
}

impl<T: Ord> RBTreeSet<T> {
    /// Returns `true` if the set contains an element equal to the value.
    ///
    /// The value may be any borrowed form of the set's element type,
    /// but the ordering on the borrowed form *must* match the
    /// ordering on the element type.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeSet;
    ///
    /// let set = RBTreeSet::from([1, 2, 3]);
    /// assert_eq!(set.contains(&1), true);
    /// assert_eq!(set.contains(&4), false);
    /// ```
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.contains_key(value)
    }

    /// Returns a reference to the element in the set, if any, that is equal to
    /// the value.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeSet;
    ///
    /// let set = RBTreeSet::from([1, 2, 3]);
    /// assert_eq!(set.get(&2), Some(&2));
    /// assert_eq!(set.get(&4), None);
    /// ```
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.get_key_value(value).map(|(k, _)| k)
    }

    /// Returns a cursor at the element equal to the value, or at the end position.
    pub fn find<Q>(&self, value: &Q) -> Cursor<'_, T, ()>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.find(value)
    }

    /// Returns a mutable cursor at the element equal to the value, or at the end position.
    pub fn find_mut<Q>(&mut self, value: &Q) -> CursorMut<'_, T, ()>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.find_mut(value)
    }

    /// Returns a cursor at the first element not less than `value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeSet;
    ///
    /// let set = RBTreeSet::from([1, 3, 5]);
    /// assert_eq!(set.lower_bound(&2).key(), Some(&3));
    /// assert!(set.lower_bound(&6).is_end());
    /// ```
    pub fn lower_bound<Q>(&self, value: &Q) -> Cursor<'_, T, ()>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.lower_bound(value)
    }

    /// Returns a cursor at the first element greater than `value`.
    pub fn upper_bound<Q>(&self, value: &Q) -> Cursor<'_, T, ()>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.upper_bound(value)
    }

    /// Adds a value to the set unless an equal value is already present.
    ///
    /// Returns a cursor at the element equal to `value`, and whether the value was newly
    /// inserted.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeSet;
    ///
    /// let mut set = RBTreeSet::new();
    ///
    /// assert_eq!(set.insert(2).1, true);
    /// assert_eq!(set.insert(2).1, false);
    /// assert_eq!(set.len(), 1);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn insert(&mut self, value: T) -> (Cursor<'_, T, ()>, bool) {
        let (cursor, inserted) = self.map.insert(value, ());
        (cursor.into(), inserted)
    }

    /// Adds every value of `iter` under the unique policy; returns, per value, whether it was
    /// inserted.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeSet;
    ///
    /// let mut set = RBTreeSet::new();
    /// assert_eq!(set.insert_many([3, 1, 3]), [true, true, false]);
    /// ```
    pub fn insert_many<I>(&mut self, iter: I) -> Vec<bool>
    where
        I: IntoIterator<Item = T>,
    {
        self.map.insert_many(iter.into_iter().map(|value| (value, ())))
    }

    /// If the set contains an element equal to the value, removes it from the
    /// set and drops it. Returns whether such an element was present.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeSet;
    ///
    /// let mut set = RBTreeSet::new();
    ///
    /// set.insert(2);
    /// assert_eq!(set.remove(&2), true);
    /// assert_eq!(set.remove(&2), false);
    /// ```
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.remove(value).is_some()
    }

    /// Removes and returns the element in the set, if any, that is equal to
    /// the value.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeSet;
    ///
    /// let mut set = RBTreeSet::from([1, 2, 3]);
    /// assert_eq!(set.take(&2), Some(2));
    /// assert_eq!(set.take(&2), None);
    /// ```
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.remove_entry(value).map(|(k, _)| k)
    }

    /// Moves every element of `other` that is absent from `self` into `self`.
    ///
    /// Elements already present in `self` stay in `other`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeSet;
    ///
    /// let mut a = RBTreeSet::from([-1, 3, 2, 5, 6]);
    /// let mut b = RBTreeSet::from([1, 3]);
    /// a.merge(&mut b);
    /// assert_eq!(a.len(), 6);
    /// assert_eq!(b.iter().collect::<Vec<_>>(), [&3]);
    /// ```
    pub fn merge(&mut self, other: &mut Self) {
        self.map.merge(&mut other.map);
    }
}

impl<T: Hash> Hash for RBTreeSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.map.hash(state);
    }
}

impl<T: PartialEq> PartialEq for RBTreeSet<T> {
    fn eq(&self, other: &RBTreeSet<T>) -> bool {
        self.map.eq(&other.map)
    }
}

impl<T: Eq> Eq for RBTreeSet<T> {}

impl<T: PartialOrd> PartialOrd for RBTreeSet<T> {
    fn partial_cmp(&self, other: &RBTreeSet<T>) -> Option<Ordering> {
        self.map.partial_cmp(&other.map)
    }
}

impl<T: Ord> Ord for RBTreeSet<T> {
    fn cmp(&self, other: &RBTreeSet<T>) -> Ordering {
        self.map.cmp(&other.map)
    }
}

impl<T: Clone> Clone for RBTreeSet<T> {
    fn clone(&self) -> Self {
        RBTreeSet { map: self.map.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for RBTreeSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T> Default for RBTreeSet<T> {
    /// Creates an empty `RBTreeSet`.
    fn default() -> RBTreeSet<T> {
        RBTreeSet::new()
    }
}

impl<T: Ord> FromIterator<T> for RBTreeSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> RBTreeSet<T> {
        let mut set = RBTreeSet::new();
        set.extend(iter);
        set
    }
}

impl<T: Ord> Extend<T> for RBTreeSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.map.extend(iter.into_iter().map(|elem| (elem, ())));
    }
}

impl<'a, T: 'a + Ord + Copy> Extend<&'a T> for RBTreeSet<T> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T: Ord, const N: usize> From<[T; N]> for RBTreeSet<T> {
    /// Converts a `[T; N]` into a `RBTreeSet<T>`.
    ///
    /// ```
    /// use rb_collections::RBTreeSet;
    ///
    /// let set1 = RBTreeSet::from([1, 2, 3, 4]);
    /// let set2: RBTreeSet<_> = [1, 2, 3, 4].into();
    /// assert_eq!(set1, set2);
    /// ```
    fn from(arr: [T; N]) -> Self {
        arr.into_iter().collect()
    }
}

impl<T> IntoIterator for RBTreeSet<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    /// Gets an iterator for moving out the `RBTreeSet`'s contents in ascending order.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeSet;
    ///
    /// let set = RBTreeSet::from([1, 2, 3, 4]);
    ///
    /// let v: Vec<_> = set.into_iter().collect();
    /// assert_eq!(v, [1, 2, 3, 4]);
    /// ```
    fn into_iter(self) -> IntoIter<T> {
        IntoIter {
            inner: self.map.into_keys(),
        }
    }
}

impl<'a, T> IntoIterator for &'a RBTreeSet<T> {
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

    fn min(mut self) -> Option<&'a T> {
        self.next()
    }

    fn max(mut self) -> Option<&'a T> {
        self.next_back()
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
    /// Creates an empty `rbtree_set::Iter`.
    ///
    /// ```
    /// # use rb_collections::rbtree_set;
    /// let iter: rbtree_set::Iter<'_, u8> = Default::default();
    /// assert_eq!(iter.len(), 0);
    /// ```
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
