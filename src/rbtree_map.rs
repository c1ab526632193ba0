use alloc::vec::Vec;
use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ops::Index;

use crate::cursor::{Cursor, CursorMut};
use crate::error::Error;
use crate::raw::{Handle, RawRBTree};
use crate::structure::Structure;

/// An ordered map based on a [red-black tree].
///
/// Given a key type with a [total order], an ordered map stores its entries in key order.
/// That means that keys must be of a type that implements the [`Ord`] trait,
/// such that two keys can always be compared to determine their [`Ordering`].
///
/// Keys are unique: inserting a key that is already present leaves the stored entry untouched
/// (use [`insert_or_assign`] to overwrite). Every entry lives in its own stable slot, so
/// removing one entry never moves another; cursors to the remaining entries stay meaningful.
///
/// Iterators obtained from functions such as [`RBTreeMap::iter`], [`RBTreeMap::into_iter`],
/// [`RBTreeMap::values`], or [`RBTreeMap::keys`] produce their items in key order, and take
/// worst-case logarithmic and amortized constant time per item returned.
///
/// It is a logic error for a key to be modified in such a way that the key's ordering relative to
/// any other key, as determined by the [`Ord`] trait, changes while it is in the map. This is
/// normally only possible through [`Cell`], [`RefCell`], global state, I/O, or unsafe code.
/// The behavior resulting from such a logic error is not specified, but will be encapsulated to the
/// `RBTreeMap` that observed the logic error and not result in undefined behavior.
///
/// # Examples
///
/// ```
/// use rb_collections::RBTreeMap;
///
/// let mut movie_reviews = RBTreeMap::new();
///
/// // review some movies.
/// movie_reviews.insert("Office Space",       "Deals with real issues in the workplace.");
/// movie_reviews.insert("Pulp Fiction",       "Masterpiece.");
/// movie_reviews.insert("The Godfather",      "Very enjoyable.");
/// movie_reviews.insert("The Blues Brothers", "Eye lyked it a lot.");
///
/// // check for a specific one.
/// if !movie_reviews.contains_key("Les Miserables") {
///     println!("We've got {} reviews, but Les Miserables ain't one.",
///              movie_reviews.len());
/// }
///
/// // oops, this review has a lot of spelling mistakes, let's fix it.
/// movie_reviews.insert_or_assign("The Blues Brothers", "Eye liked it a lot.");
///
/// // delete a review.
/// movie_reviews.remove("The Blues Brothers");
///
/// // look up the values associated with some keys.
/// let to_find = ["Up!", "Office Space"];
/// for movie in &to_find {
///     match movie_reviews.get(movie) {
///        Some(review) => println!("{movie}: {review}"),
///        None => println!("{movie} is unreviewed.")
///     }
/// }
///
/// // Look up the value for a key (will panic if the key is not found).
/// println!("Movie review: {}", movie_reviews["Office Space"]);
///
/// // iterate over everything.
/// for (movie, review) in &movie_reviews {
///     println!("{movie}: \"{review}\"");
/// }
/// ```
///
/// An `RBTreeMap` with a known list of items can be initialized from an array:
///
/// ```
/// use rb_collections::RBTreeMap;
///
/// let solar_distance = RBTreeMap::from([
///     ("Mercury", 0.4),
///     ("Venus", 0.7),
///     ("Earth", 1.0),
///     ("Mars", 1.5),
/// ]);
/// ```
///
/// [red-black tree]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
/// [total order]: https://en.wikipedia.org/wiki/Total_order
/// [`insert_or_assign`]: RBTreeMap::insert_or_assign
/// [`Cell`]: core::cell::Cell
/// [`RefCell`]: core::cell::RefCell
pub struct RBTreeMap<K, V> {
    raw: RawRBTree<K, V>,
}

/// An iterator over the entries of a `RBTreeMap`.
///
/// This `struct` is created by the [`iter`] method on [`RBTreeMap`]. See its
/// documentation for more.
///
/// # Examples
///
/// ```
/// use rb_collections::RBTreeMap;
///
/// let map = RBTreeMap::from([(1, "a"), (2, "b")]);
/// let mut iter = map.iter();
/// assert_eq!(iter.next(), Some((&1, &"a")));
/// assert_eq!(iter.next_back(), Some((&2, &"b")));
/// assert_eq!(iter.next(), None);
/// ```
///
/// [`iter`]: RBTreeMap::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V> {
    tree: *const RawRBTree<K, V>,
    front: Handle,
    back: Handle,
    remaining: usize,
    _marker: PhantomData<&'a RawRBTree<K, V>>,
}

// SAFETY: Iter behaves as &RawRBTree<K, V>, so it is Send/Sync when the tree is Sync.
unsafe impl<K: Sync, V: Sync> Send for Iter<'_, K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for Iter<'_, K, V> {}

/// A mutable iterator over the entries of a `RBTreeMap`.
///
/// This `struct` is created by the [`iter_mut`] method on [`RBTreeMap`]. See its
/// documentation for more.
///
/// # Examples
///
/// ```
/// use rb_collections::RBTreeMap;
///
/// let mut map = RBTreeMap::from([(1, 10), (2, 20)]);
/// for (_, value) in map.iter_mut() {
///     *value += 1;
/// }
/// let values: Vec<_> = map.values().copied().collect();
/// assert_eq!(values, [11, 21]);
/// ```
///
/// [`iter_mut`]: RBTreeMap::iter_mut
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct IterMut<'a, K: 'a, V: 'a> {
    tree: *mut RawRBTree<K, V>,
    front: Handle,
    back: Handle,
    remaining: usize,
    _marker: PhantomData<&'a mut (K, V)>,
}

// SAFETY: IterMut behaves as &mut RawRBTree<K, V>, so it is Send when K and V are Send.
// It is NOT Sync because mutable iterators should not be shared across threads.
unsafe impl<K: Send, V: Send> Send for IterMut<'_, K, V> {}

/// An owning iterator over the entries of a `RBTreeMap`, sorted by key.
///
/// This `struct` is created by the [`into_iter`] method on [`RBTreeMap`]
/// (provided by the [`IntoIterator`] trait). See its documentation for more.
///
/// # Examples
///
/// ```
/// use rb_collections::RBTreeMap;
///
/// let map = RBTreeMap::from([(1, "a"), (2, "b")]);
/// let mut iter = map.into_iter();
/// assert_eq!(iter.next(), Some((1, "a")));
/// assert_eq!(iter.next_back(), Some((2, "b")));
/// assert_eq!(iter.next(), None);
/// ```
///
/// [`into_iter`]: IntoIterator::into_iter
pub struct IntoIter<K, V> {
    inner: alloc::vec::IntoIter<(K, V)>,
}

/// An iterator over the keys of a `RBTreeMap`.
///
/// This `struct` is created by the [`keys`] method on [`RBTreeMap`]. See its
/// documentation for more.
///
/// [`keys`]: RBTreeMap::keys
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

/// An iterator over the values of a `RBTreeMap`.
///
/// This `struct` is created by the [`values`] method on [`RBTreeMap`]. See its
/// documentation for more.
///
/// [`values`]: RBTreeMap::values
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

/// A mutable iterator over the values of a `RBTreeMap`.
///
/// This `struct` is created by the [`values_mut`] method on [`RBTreeMap`]. See its
/// documentation for more.
///
/// [`values_mut`]: RBTreeMap::values_mut
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

/// An owning iterator over the keys of a `RBTreeMap`.
///
/// This `struct` is created by the [`into_keys`] method on [`RBTreeMap`].
/// See its documentation for more.
///
/// [`into_keys`]: RBTreeMap::into_keys
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct IntoKeys<K, V> {
    inner: IntoIter<K, V>,
}

/// An owning iterator over the values of a `RBTreeMap`.
///
/// This `struct` is created by the [`into_values`] method on [`RBTreeMap`].
/// See its documentation for more.
///
/// [`into_values`]: RBTreeMap::into_values
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct IntoValues<K, V> {
    inner: IntoIter<K, V>,
}

impl<K, V> RBTreeMap<K, V> {
    /// Makes a new, empty `RBTreeMap`.
    ///
    /// Does not allocate anything on its own.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::new();
    ///
    /// // entries can now be inserted into the empty map
    /// map.insert(1, "a");
    /// ```
    #[must_use]
    pub const fn new() -> RBTreeMap<K, V> {
        RBTreeMap {
            raw: RawRBTree::new(),
        }
    }

    /// Makes a new, empty `RBTreeMap` with room for at least `capacity` entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let map: RBTreeMap<i32, i32> = RBTreeMap::with_capacity(10);
    /// assert!(map.capacity() >= 10);
    /// ```
    #[must_use]
    pub fn with_capacity(capacity: usize) -> RBTreeMap<K, V> {
        RBTreeMap {
            raw: RawRBTree::with_capacity(capacity),
        }
    }

    /// Returns the number of entries the map can hold without reallocating.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Returns the number of elements in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut a = RBTreeMap::new();
    /// assert_eq!(a.len(), 0);
    /// a.insert(1, "a");
    /// assert_eq!(a.len(), 1);
    /// ```
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the map contains no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the largest number of entries any `RBTreeMap` can hold.
    ///
    /// Inserting beyond this panics.
    #[must_use]
    pub const fn max_len() -> usize {
        RawRBTree::<K, V>::max_len()
    }

    /// Clears the map, removing all elements.
    ///
    /// # Complexity
    ///
    /// O(n)
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut a = RBTreeMap::new();
    /// a.insert(1, "a");
    /// a.clear();
    /// assert!(a.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Swaps the contents of two maps.
    ///
    /// # Complexity
    ///
    /// O(1)
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(&mut self.raw, &mut other.raw);
    }

    /// Returns the first key-value pair in the map.
    /// The key in this pair is the minimum key in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::new();
    /// assert_eq!(map.first_key_value(), None);
    /// map.insert(1, "b");
    /// map.insert(2, "a");
    /// assert_eq!(map.first_key_value(), Some((&1, &"b")));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.cursor_front().key_value()
    }

    /// Returns the last key-value pair in the map.
    /// The key in this pair is the maximum key in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::new();
    /// map.insert(1, "b");
    /// map.insert(2, "a");
    /// assert_eq!(map.last_key_value(), Some((&2, &"a")));
    /// ```
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.cursor_back().key_value()
    }

    /// Removes and returns the first element in the map.
    /// The key of this element is the minimum key that was in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::new();
    /// map.insert(1, "a");
    /// map.insert(2, "b");
    /// while let Some((key, _val)) = map.pop_first() {
    ///     assert!(map.iter().all(|(k, _v)| *k > key));
    /// }
    /// assert!(map.is_empty());
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.raw.pop_first()
    }

    /// Removes and returns the last element in the map.
    /// The key of this element is the maximum key that was in the map.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.raw.pop_last()
    }

    /// Returns a cursor at the first entry, or at the end position if the map is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let map = RBTreeMap::from([(2, "b"), (1, "a")]);
    /// assert_eq!(map.cursor_front().key(), Some(&1));
    /// ```
    pub fn cursor_front(&self) -> Cursor<'_, K, V> {
        Cursor::new(&self.raw, self.raw.first())
    }

    /// Returns a cursor at the last entry, or at the end position if the map is empty.
    pub fn cursor_back(&self) -> Cursor<'_, K, V> {
        Cursor::new(&self.raw, self.raw.last())
    }

    /// Returns a cursor at the end position.
    ///
    /// Moving it backward reaches the last entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let map = RBTreeMap::from([(1, "a"), (2, "b")]);
    /// let mut cursor = map.cursor_end();
    /// assert!(cursor.is_end());
    /// cursor.move_prev();
    /// assert_eq!(cursor.key(), Some(&2));
    /// ```
    pub fn cursor_end(&self) -> Cursor<'_, K, V> {
        Cursor::new(&self.raw, Handle::NIL)
    }

    /// Returns a mutable cursor at the first entry, or at the end position if the map is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::from([(1, 1), (2, 2), (3, 3)]);
    /// let mut cursor = map.cursor_front_mut();
    /// while let Some(&key) = cursor.key() {
    ///     if key % 2 == 1 {
    ///         cursor.remove_current();
    ///     } else {
    ///         cursor.move_next();
    ///     }
    /// }
    /// assert_eq!(map.into_keys().collect::<Vec<_>>(), [2]);
    /// ```
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, K, V> {
        let first = self.raw.first();
        CursorMut::new(&mut self.raw, first)
    }

    /// Gets an iterator over the entries of the map, sorted by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::new();
    /// map.insert(3, "c");
    /// map.insert(2, "b");
    /// map.insert(1, "a");
    ///
    /// let (first_key, first_value) = map.iter().next().unwrap();
    /// assert_eq!((*first_key, *first_value), (1, "a"));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n) to create the iterator; amortized O(1) per iteration step.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.raw)
    }

    /// Gets a mutable iterator over the entries of the map, sorted by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::from([
    ///    ("a", 1),
    ///    ("b", 2),
    ///    ("c", 3),
    /// ]);
    ///
    /// // add 10 to the value if the key isn't "a"
    /// for (key, value) in map.iter_mut() {
    ///     if key != &"a" {
    ///         *value += 10;
    ///     }
    /// }
    /// assert_eq!(map["c"], 13);
    /// ```
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            front: self.raw.first(),
            back: self.raw.last(),
            remaining: self.raw.len(),
            tree: &raw mut self.raw,
            _marker: PhantomData,
        }
    }

    /// Gets an iterator over the keys of the map, in sorted order.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let map = RBTreeMap::from([(2, "b"), (1, "a")]);
    /// let keys: Vec<_> = map.keys().copied().collect();
    /// assert_eq!(keys, [1, 2]);
    /// ```
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Gets an iterator over the values of the map, in order by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let map = RBTreeMap::from([(1, "hello"), (2, "goodbye")]);
    /// let values: Vec<&str> = map.values().copied().collect();
    /// assert_eq!(values, ["hello", "goodbye"]);
    /// ```
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Gets a mutable iterator over the values of the map, in order by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::from([(1, String::from("hello")), (2, String::from("goodbye"))]);
    /// for value in map.values_mut() {
    ///     value.push_str("!");
    /// }
    /// let values: Vec<String> = map.values().cloned().collect();
    /// assert_eq!(values, [String::from("hello!"), String::from("goodbye!")]);
    /// ```
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut { inner: self.iter_mut() }
    }

    /// Creates a consuming iterator visiting all the keys, in sorted order.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let map = RBTreeMap::from([(2, "b"), (1, "a")]);
    /// let keys: Vec<i32> = map.into_keys().collect();
    /// assert_eq!(keys, [1, 2]);
    /// ```
    pub fn into_keys(self) -> IntoKeys<K, V> {
        IntoKeys { inner: self.into_iter() }
    }

    /// Creates a consuming iterator visiting all the values, in order by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let map = RBTreeMap::from([(1, "hello"), (2, "goodbye")]);
    /// let values: Vec<&str> = map.into_values().collect();
    /// assert_eq!(values, ["hello", "goodbye"]);
    /// ```
    pub fn into_values(self) -> IntoValues<K, V> {
        IntoValues { inner: self.into_iter() }
    }

    /// Returns a diagnostic dump of the tree behind the map.
    ///
    /// Entries are shown as `{key,value}`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let map = RBTreeMap::from([(1, "one")]);
    /// assert_eq!(map.structure().to_string(), "N\n├──B:{1,one}\n│   ├──N\n│   └──N\n");
    /// ```
    pub fn structure(&self) -> Structure<'_, K, V>
    where
        K: fmt::Display,
        V: fmt::Display,
    {
        Structure::new(&self.raw, |key, value, f| write!(f, "{{{key},{value}}}"))
    }

    pub(crate) const fn raw(&self) -> &RawRBTree<K, V> {
        &self.raw
    }
}

impl<K: Ord, V> RBTreeMap<K, V> {
    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but the ordering
    /// on the borrowed form *must* match the ordering on the key type.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.find(key).value()
    }

    /// Returns the key-value pair corresponding to the supplied key.
    ///
    /// The supplied key may be any borrowed form of the map's key type, but the ordering
    /// on the borrowed form *must* match the ordering on the key type.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.get_key_value(&1), Some((&1, &"a")));
    /// assert_eq!(map.get_key_value(&2), None);
    /// ```
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.find(key).key_value()
    }

    /// Returns a mutable reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::new();
    /// map.insert(1, "a");
    /// if let Some(x) = map.get_mut(&1) {
    ///     *x = "b";
    /// }
    /// assert_eq!(map[&1], "b");
    /// ```
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.find_mut(key).into_value_mut()
    }

    /// Returns `true` if the map contains a value for the specified key.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.contains_key(&1), true);
    /// assert_eq!(map.contains_key(&2), false);
    /// ```
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        !self.raw.find(key).is_nil()
    }

    /// Returns a reference to the value corresponding to the key, or
    /// [`Error::KeyNotFound`] if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] when no entry has the key.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::{Error, RBTreeMap};
    ///
    /// let map = RBTreeMap::from([(1, "a")]);
    /// assert_eq!(map.at(&1), Ok(&"a"));
    /// assert_eq!(map.at(&2), Err(Error::KeyNotFound));
    /// ```
    pub fn at<Q>(&self, key: &Q) -> Result<&V, Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    /// Returns a mutable reference to the value corresponding to the key, or
    /// [`Error::KeyNotFound`] if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] when no entry has the key.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::{Error, RBTreeMap};
    ///
    /// let mut map = RBTreeMap::from([(1, 10)]);
    /// *map.at_mut(&1)? += 1;
    /// assert_eq!(map[&1], 11);
    /// assert!(map.at_mut(&2).is_err());
    /// # Ok::<(), Error>(())
    /// ```
    pub fn at_mut<Q>(&mut self, key: &Q) -> Result<&mut V, Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.get_mut(key).ok_or(Error::KeyNotFound)
    }

    /// Returns a mutable reference to the value for `key`, inserting `V::default()` first if
    /// the key is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut counts: RBTreeMap<&str, usize> = RBTreeMap::new();
    /// for word in ["a", "b", "a"] {
    ///     *counts.get_or_insert_default(word) += 1;
    /// }
    /// assert_eq!(counts[&"a"], 2);
    /// assert_eq!(counts[&"b"], 1);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let mut handle = self.raw.find(&key);
        if handle.is_nil() {
            handle = self.raw.insert_multi(key, V::default());
        }
        self.raw.value_mut(handle)
    }

    /// Inserts a key-value pair into the map unless the key is already present.
    ///
    /// Returns a cursor at the entry with that key, and `true` if the pair was inserted. When
    /// the key was already present, the stored key and value are left untouched and `false`
    /// is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::new();
    /// let (cursor, inserted) = map.insert(37, "a");
    /// assert!(inserted);
    /// assert_eq!(cursor.key(), Some(&37));
    ///
    /// let (cursor, inserted) = map.insert(37, "b");
    /// assert!(!inserted);
    /// assert_eq!(cursor.value(), Some(&"a"));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn insert(&mut self, key: K, value: V) -> (CursorMut<'_, K, V>, bool) {
        let (handle, inserted) = self.raw.insert_unique(key, value);
        (CursorMut::new(&mut self.raw, handle), inserted)
    }

    /// Inserts a key-value pair, overwriting the value if the key is already present.
    ///
    /// Returns a cursor at the entry and `true` if a new entry was created, `false` if an
    /// existing value was replaced.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::new();
    /// let (_, inserted) = map.insert_or_assign(1, "a");
    /// assert!(inserted);
    /// let (cursor, inserted) = map.insert_or_assign(1, "b");
    /// assert!(!inserted);
    /// assert_eq!(cursor.value(), Some(&"b"));
    /// ```
    pub fn insert_or_assign(&mut self, key: K, value: V) -> (CursorMut<'_, K, V>, bool) {
        let (handle, old) = self.raw.insert_or_assign(key, value);
        (CursorMut::new(&mut self.raw, handle), old.is_none())
    }

    /// Inserts every pair of `iter` under the unique-key policy.
    ///
    /// Returns, for each pair in order, whether it was inserted.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::new();
    /// let inserted = map.insert_many([(1, "one"), (1, "two"), (3, "three")]);
    /// assert_eq!(inserted, [true, false, true]);
    /// assert_eq!(map[&1], "one");
    /// ```
    pub fn insert_many<I>(&mut self, iter: I) -> Vec<bool>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        iter.into_iter().map(|(key, value)| self.raw.insert_unique(key, value).1).collect()
    }

    /// Removes a key from the map, returning the value at the key if the key
    /// was previously in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.remove(key).map(|(_, value)| value)
    }

    /// Removes a key from the map, returning the stored key and value if the key
    /// was previously in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.remove_entry(&1), Some((1, "a")));
    /// assert_eq!(map.remove_entry(&1), None);
    /// ```
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.remove(key)
    }

    /// Returns a cursor at the entry with the given key, or at the end position if there is
    /// none.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let map = RBTreeMap::from([(1, "a"), (2, "b")]);
    /// assert_eq!(map.find(&2).value(), Some(&"b"));
    /// assert_eq!(map.find(&3), map.cursor_end());
    /// ```
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        Cursor::new(&self.raw, self.raw.find(key))
    }

    /// Returns a mutable cursor at the entry with the given key, or at the end position if
    /// there is none.
    pub fn find_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.raw.find(key);
        CursorMut::new(&mut self.raw, handle)
    }

    /// Returns a cursor at the first entry whose key is not less than `key`, or at the end
    /// position if there is none.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let map = RBTreeMap::from([(1, "a"), (3, "c"), (5, "e")]);
    /// assert_eq!(map.lower_bound(&3).key(), Some(&3));
    /// assert_eq!(map.lower_bound(&4).key(), Some(&5));
    /// assert!(map.lower_bound(&6).is_end());
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn lower_bound<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        Cursor::new(&self.raw, self.raw.lower_bound(key))
    }

    /// Returns a cursor at the first entry whose key is greater than `key`, or at the end
    /// position if there is none.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let map = RBTreeMap::from([(1, "a"), (3, "c"), (5, "e")]);
    /// assert_eq!(map.upper_bound(&3).key(), Some(&5));
    /// assert_eq!(map.upper_bound(&0).key(), Some(&1));
    /// assert!(map.upper_bound(&5).is_end());
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn upper_bound<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        Cursor::new(&self.raw, self.raw.upper_bound(key))
    }

    /// Moves every entry of `other` whose key is absent from `self` into `self`.
    ///
    /// Entries whose keys are already present stay in `other`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut a = RBTreeMap::from([(1, "a"), (2, "b")]);
    /// let mut b = RBTreeMap::from([(2, "x"), (3, "c")]);
    /// a.merge(&mut b);
    /// assert_eq!(a.len(), 3);
    /// assert_eq!(a[&2], "b");
    /// assert_eq!(b.into_iter().collect::<Vec<_>>(), [(2, "x")]);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(m log(n + m)) where m is `other.len()`.
    pub fn merge(&mut self, other: &mut Self) {
        self.raw.merge_unique(&mut other.raw);
    }
}

impl<K: Clone, V: Clone> Clone for RBTreeMap<K, V> {
    fn clone(&self) -> Self {
        RBTreeMap { raw: self.raw.clone() }
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for RBTreeMap<K, V> {
    fn eq(&self, other: &RBTreeMap<K, V>) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a == b)
    }
}

impl<K: Eq, V: Eq> Eq for RBTreeMap<K, V> {}

impl<K: PartialOrd, V: PartialOrd> PartialOrd for RBTreeMap<K, V> {
    fn partial_cmp(&self, other: &RBTreeMap<K, V>) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<K: Ord, V: Ord> Ord for RBTreeMap<K, V> {
    fn cmp(&self, other: &RBTreeMap<K, V>) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<K: Hash, V: Hash> Hash for RBTreeMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for elt in self {
            elt.hash(state);
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for RBTreeMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> Default for RBTreeMap<K, V> {
    /// Creates an empty `RBTreeMap`.
    fn default() -> Self {
        RBTreeMap::new()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for RBTreeMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = RBTreeMap::new();
        map.extend(iter);
        map
    }
}

impl<K: Ord, V> Extend<(K, V)> for RBTreeMap<K, V> {
    /// Inserts every pair; pairs whose key is already present are dropped.
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.raw.insert_unique(k, v);
        }
    }
}

impl<'a, K: Ord + Copy, V: Copy> Extend<(&'a K, &'a V)> for RBTreeMap<K, V> {
    fn extend<T: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: T) {
        self.extend(iter.into_iter().map(|(&k, &v)| (k, v)));
    }
}

impl<'a, K, V> IntoIterator for &'a RBTreeMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V> IntoIterator for &'a mut RBTreeMap<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

impl<K, V> IntoIterator for RBTreeMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    /// Gets an owning iterator over the entries of the map, sorted by key.
    fn into_iter(mut self) -> IntoIter<K, V> {
        IntoIter::new(self.raw.drain_to_vec())
    }
}

impl<K, Q, V> Index<&Q> for RBTreeMap<K, V>
where
    K: Borrow<Q> + Ord,
    Q: ?Sized + Ord,
{
    type Output = V;

    /// Returns a reference to the value corresponding to the supplied key.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the `RBTreeMap`.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K: Ord, V, const N: usize> From<[(K, V); N]> for RBTreeMap<K, V> {
    /// Converts a `[(K, V); N]` into a `RBTreeMap<K, V>`; later duplicates of a key are dropped.
    fn from(arr: [(K, V); N]) -> Self {
        arr.into_iter().collect()
    }
}

// ─── Iter ───

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(tree: &'a RawRBTree<K, V>) -> Self {
        Iter {
            tree: &raw const *tree,
            front: tree.first(),
            back: tree.last(),
            remaining: tree.len(),
            _marker: PhantomData,
        }
    }
}

impl<'a, K: 'a, V: 'a> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        // SAFETY: When remaining > 0, self.tree is a valid pointer obtained from a live
        // reference in Iter::new().
        let tree = unsafe { &*self.tree };
        let handle = self.front;
        self.front = tree.successor(handle);
        self.remaining -= 1;
        Some(tree.key_value(handle))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K: 'a, V: 'a> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        // SAFETY: When remaining > 0, self.tree is a valid pointer.
        let tree = unsafe { &*self.tree };
        let handle = self.back;
        self.back = tree.predecessor(handle);
        self.remaining -= 1;
        Some(tree.key_value(handle))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").field("remaining", &self.remaining).finish()
    }
}

impl<'a, K: 'a, V: 'a> Default for Iter<'a, K, V> {
    /// Creates an empty `rbtree_map::Iter`.
    ///
    /// ```
    /// # use rb_collections::rbtree_map;
    /// let iter: rbtree_map::Iter<'_, u8, u8> = Default::default();
    /// assert_eq!(iter.len(), 0);
    /// ```
    fn default() -> Self {
        Iter {
            // SAFETY: tree is never dereferenced when remaining == 0, so a dangling pointer is
            // safe here.
            tree: core::ptr::NonNull::dangling().as_ptr(),
            front: Handle::NIL,
            back: Handle::NIL,
            remaining: 0,
            _marker: PhantomData,
        }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            tree: self.tree,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
            _marker: PhantomData,
        }
    }
}

// ─── IterMut ───

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let handle = self.front;
        // SAFETY: We have exclusive access to the tree through the raw pointer and never visit
        // the same entry twice. Links and keys are only read; each value slot is reborrowed
        // alone.
        unsafe {
            self.front = RawRBTree::successor_ptr(self.tree, handle);
            self.remaining -= 1;
            Some(RawRBTree::key_value_mut_ptr(self.tree, handle))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let handle = self.back;
        // SAFETY: Same as in next().
        unsafe {
            self.back = RawRBTree::predecessor_ptr(self.tree, handle);
            self.remaining -= 1;
            Some(RawRBTree::key_value_mut_ptr(self.tree, handle))
        }
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for IterMut<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for IterMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterMut").field("remaining", &self.remaining).finish()
    }
}

impl<'a, K: 'a, V: 'a> Default for IterMut<'a, K, V> {
    /// Creates an empty `rbtree_map::IterMut`.
    fn default() -> Self {
        IterMut {
            tree: core::ptr::null_mut(),
            front: Handle::NIL,
            back: Handle::NIL,
            remaining: 0,
            _marker: PhantomData,
        }
    }
}

// ─── IntoIter ───

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(entries: Vec<(K, V)>) -> Self {
        IntoIter {
            inner: entries.into_iter(),
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for IntoIter<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntoIter").field("len", &self.inner.len()).finish()
    }
}

impl<K, V> Default for IntoIter<K, V> {
    /// Creates an empty `rbtree_map::IntoIter`.
    fn default() -> Self {
        IntoIter {
            inner: Vec::new().into_iter(),
        }
    }
}

// ─── Keys / Values / ValuesMut ───

impl<'a, K, V> Keys<'a, K, V> {
    pub(crate) fn new(tree: &'a RawRBTree<K, V>) -> Self {
        Keys { inner: Iter::new(tree) }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for Keys<'a, K, V> {
    fn next_back(&mut self) -> Option<&'a K> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Keys {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> Default for Keys<'_, K, V> {
    fn default() -> Self {
        Keys {
            inner: Iter::default(),
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Keys<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for Values<'a, K, V> {
    fn next_back(&mut self) -> Option<&'a V> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Values<'_, K, V> {}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Values {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V: fmt::Debug> fmt::Debug for Values<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for ValuesMut<'a, K, V> {
    fn next_back(&mut self) -> Option<&'a mut V> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

impl<K, V> fmt::Debug for ValuesMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValuesMut").field("remaining", &self.inner.len()).finish()
    }
}

// ─── IntoKeys / IntoValues ───

impl<K, V> IntoKeys<K, V> {
    pub(crate) fn new(entries: Vec<(K, V)>) -> Self {
        IntoKeys {
            inner: IntoIter::new(entries),
        }
    }
}

impl<K, V> Iterator for IntoKeys<K, V> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoKeys<K, V> {
    fn next_back(&mut self) -> Option<K> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for IntoKeys<K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IntoKeys<K, V> {}

impl<K: fmt::Debug, V> fmt::Debug for IntoKeys<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntoKeys").field("len", &self.inner.len()).finish()
    }
}

impl<K, V> Iterator for IntoValues<K, V> {
    type Item = V;

    fn next(&mut self) -> Option<V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoValues<K, V> {
    fn next_back(&mut self) -> Option<V> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for IntoValues<K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IntoValues<K, V> {}

impl<K, V: fmt::Debug> fmt::Debug for IntoValues<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntoValues").field("len", &self.inner.len()).finish()
    }
}
