use alloc::string::String;
use alloc::vec::Vec;
use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;

use log::{debug, trace};
use smallvec::SmallVec;

use super::arena::Arena;
use super::handle::Handle;
use super::node::{Color, Links, Node};

/// Formats one entry of a structural dump.
pub(crate) type EntryFormatter<K, V> = fn(&K, &V, &mut fmt::Formatter<'_>) -> fmt::Result;

/// The red-black tree engine backing `RBTreeMap`, `RBTreeSet` and `RBTreeMultiSet`.
///
/// Uniqueness is not an engine invariant: `insert_multi` always attaches a new node and
/// `insert_unique` is a find-then-insert policy on top of it.
pub(crate) struct RawRBTree<K, V> {
    /// Nodes: links plus key.
    nodes: Arena<Node<K>>,
    /// Values, addressed by `Node::value`.
    values: Arena<V>,
    /// `Handle::NIL` when the tree is empty.
    root: Handle,
    /// Number of real nodes.
    len: usize,
}

impl<K, V> RawRBTree<K, V> {
    /// Creates a new, empty tree.
    pub(crate) const fn new() -> Self {
        Self {
            nodes: Arena::new(),
            values: Arena::new(),
            root: Handle::NIL,
            len: 0,
        }
    }

    /// Creates a new tree with room for `capacity` entries.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Arena::with_capacity(capacity),
            values: Arena::with_capacity(capacity),
            root: Handle::NIL,
            len: 0,
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// Largest number of entries a tree can hold.
    pub(crate) const fn max_len() -> usize {
        Handle::MAX
    }

    /// Drops every entry.
    pub(crate) fn clear(&mut self) {
        debug!("clearing tree of {} entries", self.len);
        self.nodes.clear();
        self.values.clear();
        self.root = Handle::NIL;
        self.len = 0;
    }

    // ─── Links ───

    #[inline]
    fn links_in(nodes: &Arena<Node<K>>, handle: Handle) -> &Links {
        if handle.is_nil() {
            &Links::NIL
        } else {
            nodes.get(handle).links()
        }
    }

    #[inline]
    fn links(&self, handle: Handle) -> &Links {
        Self::links_in(&self.nodes, handle)
    }

    /// The sentinel's links are never written.
    #[inline]
    fn links_mut(&mut self, handle: Handle) -> Option<&mut Links> {
        if handle.is_nil() {
            None
        } else {
            Some(self.nodes.get_mut(handle).links_mut())
        }
    }

    #[inline]
    fn parent(&self, handle: Handle) -> Handle {
        self.links(handle).parent
    }

    #[inline]
    fn left(&self, handle: Handle) -> Handle {
        self.links(handle).left
    }

    #[inline]
    fn right(&self, handle: Handle) -> Handle {
        self.links(handle).right
    }

    #[inline]
    fn color(&self, handle: Handle) -> Color {
        self.links(handle).color
    }

    #[inline]
    fn is_red(&self, handle: Handle) -> bool {
        self.color(handle) == Color::Red
    }

    #[inline]
    fn is_black(&self, handle: Handle) -> bool {
        self.color(handle) == Color::Black
    }

    fn set_parent(&mut self, handle: Handle, parent: Handle) {
        if let Some(links) = self.links_mut(handle) {
            links.parent = parent;
        }
    }

    fn set_left(&mut self, handle: Handle, left: Handle) {
        if let Some(links) = self.links_mut(handle) {
            links.left = left;
        }
    }

    fn set_right(&mut self, handle: Handle, right: Handle) {
        if let Some(links) = self.links_mut(handle) {
            links.right = right;
        }
    }

    fn set_color(&mut self, handle: Handle, color: Color) {
        if let Some(links) = self.links_mut(handle) {
            links.color = color;
        }
    }

    /// Whether `handle` is the left child of a real parent.
    fn is_left(&self, handle: Handle) -> bool {
        let parent = self.parent(handle);
        !parent.is_nil() && self.left(parent) == handle
    }

    fn sibling(&self, handle: Handle) -> Handle {
        let parent = self.parent(handle);
        if self.left(parent) == handle {
            self.right(parent)
        } else {
            self.left(parent)
        }
    }

    fn grandparent(&self, handle: Handle) -> Handle {
        self.parent(self.parent(handle))
    }

    // ─── Payload ───

    #[inline]
    pub(crate) fn key(&self, handle: Handle) -> &K {
        self.nodes.get(handle).key()
    }

    #[inline]
    pub(crate) fn value(&self, handle: Handle) -> &V {
        self.values.get(self.nodes.get(handle).value())
    }

    #[inline]
    pub(crate) fn value_mut(&mut self, handle: Handle) -> &mut V {
        let value = self.nodes.get(handle).value();
        self.values.get_mut(value)
    }

    #[inline]
    pub(crate) fn key_value(&self, handle: Handle) -> (&K, &V) {
        let node = self.nodes.get(handle);
        (node.key(), self.values.get(node.value()))
    }

    #[inline]
    pub(crate) fn key_value_mut(&mut self, handle: Handle) -> (&K, &mut V) {
        let node = self.nodes.get(handle);
        (node.key(), self.values.get_mut(node.value()))
    }

    /// Returns the key and a mutable value reference from a raw pointer.
    ///
    /// # Safety
    /// - `ptr` must point to a valid, allocated `RawRBTree<K, V>`.
    /// - The caller must have logical exclusive access to the value at `handle`.
    #[inline]
    pub(crate) unsafe fn key_value_mut_ptr<'a>(ptr: *mut Self, handle: Handle) -> (&'a K, &'a mut V) {
        // SAFETY: Nodes are only read; the value slot is reborrowed alone, so values handed out
        // earlier for other handles are untouched.
        unsafe {
            let node = Arena::get_ptr(&raw const (*ptr).nodes, handle);
            let value = Arena::get_mut_ptr(&raw mut (*ptr).values, node.value());
            (node.key(), value)
        }
    }

    fn take_entry(&mut self, handle: Handle) -> (K, V) {
        let node = self.nodes.take(handle);
        let value = self.values.take(node.value());
        (node.into_key(), value)
    }

    // ─── Navigation ───

    fn minimum_in(nodes: &Arena<Node<K>>, mut handle: Handle) -> Handle {
        if handle.is_nil() {
            return handle;
        }
        loop {
            let left = Self::links_in(nodes, handle).left;
            if left.is_nil() {
                return handle;
            }
            handle = left;
        }
    }

    fn maximum_in(nodes: &Arena<Node<K>>, mut handle: Handle) -> Handle {
        if handle.is_nil() {
            return handle;
        }
        loop {
            let right = Self::links_in(nodes, handle).right;
            if right.is_nil() {
                return handle;
            }
            handle = right;
        }
    }

    /// In-order successor of a real node, or `NIL` past the last one.
    fn next_in(nodes: &Arena<Node<K>>, handle: Handle) -> Handle {
        let links = Self::links_in(nodes, handle);
        if !links.right.is_nil() {
            return Self::minimum_in(nodes, links.right);
        }
        let mut child = handle;
        let mut parent = links.parent;
        while !parent.is_nil() && Self::links_in(nodes, parent).right == child {
            child = parent;
            parent = Self::links_in(nodes, parent).parent;
        }
        parent
    }

    /// In-order predecessor of a real node, or `NIL` before the first one.
    fn prev_in(nodes: &Arena<Node<K>>, handle: Handle) -> Handle {
        let links = Self::links_in(nodes, handle);
        if !links.left.is_nil() {
            return Self::maximum_in(nodes, links.left);
        }
        let mut child = handle;
        let mut parent = links.parent;
        while !parent.is_nil() && Self::links_in(nodes, parent).left == child {
            child = parent;
            parent = Self::links_in(nodes, parent).parent;
        }
        parent
    }

    pub(crate) fn first(&self) -> Handle {
        Self::minimum_in(&self.nodes, self.root)
    }

    pub(crate) fn last(&self) -> Handle {
        Self::maximum_in(&self.nodes, self.root)
    }

    /// Next position in the ring `first ..= last, NIL`.
    pub(crate) fn successor(&self, handle: Handle) -> Handle {
        if handle.is_nil() {
            self.first()
        } else {
            Self::next_in(&self.nodes, handle)
        }
    }

    /// Previous position in the ring `first ..= last, NIL`.
    pub(crate) fn predecessor(&self, handle: Handle) -> Handle {
        if handle.is_nil() {
            self.last()
        } else {
            Self::prev_in(&self.nodes, handle)
        }
    }

    /// Successor of a real node, read through a raw pointer.
    ///
    /// # Safety
    /// - `ptr` must point to a valid, allocated `RawRBTree<K, V>`.
    /// - No mutable reference into the node arena may be live (value references are fine).
    pub(crate) unsafe fn successor_ptr(ptr: *const Self, handle: Handle) -> Handle {
        // SAFETY: Caller guarantees ptr is valid; only the node arena is borrowed.
        let nodes = unsafe { &(*ptr).nodes };
        Self::next_in(nodes, handle)
    }

    /// Predecessor of a real node, read through a raw pointer.
    ///
    /// # Safety
    /// Same contract as [`Self::successor_ptr`].
    pub(crate) unsafe fn predecessor_ptr(ptr: *const Self, handle: Handle) -> Handle {
        // SAFETY: Caller guarantees ptr is valid; only the node arena is borrowed.
        let nodes = unsafe { &(*ptr).nodes };
        Self::prev_in(nodes, handle)
    }

    /// Every real handle, in order.
    pub(crate) fn handles(&self) -> Vec<Handle> {
        let mut handles = Vec::with_capacity(self.len);
        let mut handle = self.first();
        while !handle.is_nil() {
            handles.push(handle);
            handle = Self::next_in(&self.nodes, handle);
        }
        handles
    }

    // ─── Restructuring ───

    /// Puts `v` where `u` hangs from its parent. `u`'s own links are left untouched.
    fn transplant(&mut self, u: Handle, v: Handle) {
        let parent = self.parent(u);
        if parent.is_nil() {
            self.root = v;
        } else if self.left(parent) == u {
            self.set_left(parent, v);
        } else {
            self.set_right(parent, v);
        }
        self.set_parent(v, parent);
    }

    /// Trinode restructuring of `x`, its parent `y` and grandparent `z`.
    ///
    /// Relabels the three as `a < b < c` in key order, hangs `b` where `z` was with `a` and `c`
    /// as its children, and reattaches the two inner subtrees `t2` (under `a`) and `t3` (under
    /// `c`). Covers all four rotation cases. Colors are left to the caller. Returns `b`.
    fn restructure(&mut self, x: Handle) -> Handle {
        let y = self.parent(x);
        let z = self.parent(y);
        let (a, b, c, t2, t3) = match (self.is_left(y), self.is_left(x)) {
            (false, false) => (z, y, x, self.left(y), self.left(x)),
            (false, true) => (z, x, y, self.left(x), self.right(x)),
            (true, true) => (x, y, z, self.right(x), self.right(y)),
            (true, false) => (y, x, z, self.left(x), self.right(x)),
        };
        trace!("restructure {x:?} / {y:?} / {z:?}, new subtree root {b:?}");

        self.transplant(z, b);
        self.set_left(b, a);
        self.set_parent(a, b);
        self.set_right(b, c);
        self.set_parent(c, b);
        self.set_right(a, t2);
        self.set_parent(t2, a);
        self.set_left(c, t3);
        self.set_parent(t3, c);
        b
    }

    /// Removes a red-red violation between a freshly attached red `node` and its parent.
    fn insert_fixup(&mut self, mut node: Handle) {
        loop {
            let parent = self.parent(node);
            if parent == self.root || self.is_black(parent) {
                return;
            }

            let uncle = self.sibling(parent);
            if self.is_black(uncle) {
                let b = self.restructure(node);
                self.set_color(b, Color::Black);
                self.set_color(self.left(b), Color::Red);
                self.set_color(self.right(b), Color::Red);
                return;
            }

            // Red uncle: push the violation up.
            let grandparent = self.grandparent(node);
            trace!("recolor below {grandparent:?}");
            self.set_color(parent, Color::Black);
            self.set_color(uncle, Color::Black);
            if grandparent == self.root {
                return;
            }
            self.set_color(grandparent, Color::Red);
            node = grandparent;
        }
    }

    /// Erases a real node and returns its entry.
    ///
    /// A node with two children is replaced by physically relinking its in-order successor,
    /// so every other handle keeps addressing the same entry.
    pub(crate) fn erase(&mut self, z: Handle) -> (K, V) {
        let left = self.left(z);
        let right = self.right(z);
        let z_color = self.color(z);

        let (x, x_parent, removed) = if left.is_nil() {
            let parent = self.parent(z);
            self.transplant(z, right);
            (right, parent, z_color)
        } else if right.is_nil() {
            let parent = self.parent(z);
            self.transplant(z, left);
            (left, parent, z_color)
        } else {
            let y = Self::minimum_in(&self.nodes, right);
            let y_color = self.color(y);
            let x = self.right(y);
            let x_parent = if self.parent(y) == z {
                y
            } else {
                let parent = self.parent(y);
                self.transplant(y, x);
                self.set_right(y, right);
                self.set_parent(right, y);
                parent
            };
            self.transplant(z, y);
            self.set_left(y, left);
            self.set_parent(left, y);
            self.set_color(y, z_color);
            (x, x_parent, y_color)
        };

        trace!("erase {z:?}, removed a {removed:?} node");
        let entry = self.take_entry(z);
        self.len -= 1;
        if removed == Color::Black {
            self.erase_fixup(x, x_parent);
        }
        entry
    }

    /// Restores black-heights after a black node left the position now held by `x`.
    ///
    /// `x` may be the sentinel, so its parent is carried in `parent`.
    fn erase_fixup(&mut self, mut x: Handle, mut parent: Handle) {
        while x != self.root && self.is_black(x) {
            let x_is_left = self.left(parent) == x;
            let sibling = if x_is_left {
                self.right(parent)
            } else {
                self.left(parent)
            };

            if self.is_red(sibling) {
                // Rotate the sibling up; the new sibling is black.
                let outer = if x_is_left {
                    self.right(sibling)
                } else {
                    self.left(sibling)
                };
                self.restructure(outer);
                self.set_color(sibling, Color::Black);
                self.set_color(parent, Color::Red);
                continue;
            }

            let nephew = if self.is_red(self.left(sibling)) {
                self.left(sibling)
            } else {
                self.right(sibling)
            };
            if self.is_red(nephew) {
                let top = self.color(parent);
                let b = self.restructure(nephew);
                self.set_color(b, top);
                self.set_color(self.left(b), Color::Black);
                self.set_color(self.right(b), Color::Black);
                return;
            }

            trace!("recolor {sibling:?}, deficit moves to {parent:?}");
            self.set_color(sibling, Color::Red);
            if self.is_red(parent) {
                self.set_color(parent, Color::Black);
                return;
            }
            x = parent;
            parent = self.parent(x);
        }
        self.set_color(x, Color::Black);
    }

    pub(crate) fn pop_first(&mut self) -> Option<(K, V)> {
        let first = self.first();
        (!first.is_nil()).then(|| self.erase(first))
    }

    pub(crate) fn pop_last(&mut self) -> Option<(K, V)> {
        let last = self.last();
        (!last.is_nil()).then(|| self.erase(last))
    }

    /// Moves every entry out in order, leaving the tree empty.
    pub(crate) fn drain_to_vec(&mut self) -> Vec<(K, V)> {
        debug!("draining tree of {} entries", self.len);
        // Collect first: taking a node would break the parent walk of later steps.
        let handles = self.handles();
        let mut entries = Vec::with_capacity(handles.len());
        for handle in handles {
            entries.push(self.take_entry(handle));
        }
        self.clear();
        entries
    }

    /// Pre-order dump: `N` header, then one line per node (`R:`/`B:` plus the entry) and per
    /// sentinel leaf (`N`), indented with box-drawing guides.
    pub(crate) fn write_structure(&self, f: &mut fmt::Formatter<'_>, entry: EntryFormatter<K, V>) -> fmt::Result {
        writeln!(f, "N")?;
        if self.root.is_nil() {
            return Ok(());
        }

        // (node, prefix, drawn as a left child)
        let mut stack: SmallVec<[(Handle, String, bool); 32]> = SmallVec::new();
        stack.push((self.root, String::new(), true));
        while let Some((handle, prefix, is_left)) = stack.pop() {
            f.write_str(&prefix)?;
            f.write_str(if is_left { "├──" } else { "└──" })?;
            if handle.is_nil() {
                writeln!(f, "N")?;
                continue;
            }

            f.write_str(if self.is_red(handle) { "R:" } else { "B:" })?;
            let (key, value) = self.key_value(handle);
            entry(key, value, f)?;
            writeln!(f)?;

            let mut child_prefix = prefix;
            child_prefix.push_str(if is_left { "│   " } else { "    " });
            stack.push((self.right(handle), child_prefix.clone(), false));
            stack.push((self.left(handle), child_prefix, true));
        }
        Ok(())
    }
}

impl<K: Ord, V> RawRBTree<K, V> {
    /// Some node whose key equals `key`, or `NIL`.
    pub(crate) fn find<Q>(&self, key: &Q) -> Handle
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current = self.root;
        while !current.is_nil() {
            match key.cmp(self.key(current).borrow()) {
                Ordering::Less => current = self.left(current),
                Ordering::Greater => current = self.right(current),
                Ordering::Equal => return current,
            }
        }
        Handle::NIL
    }

    /// First node whose key is not less than `key`, or `NIL`.
    pub(crate) fn lower_bound<Q>(&self, key: &Q) -> Handle
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current = self.root;
        let mut bound = Handle::NIL;
        while !current.is_nil() {
            if self.key(current).borrow() < key {
                current = self.right(current);
            } else {
                bound = current;
                current = self.left(current);
            }
        }
        bound
    }

    /// First node whose key is greater than `key`, or `NIL`.
    pub(crate) fn upper_bound<Q>(&self, key: &Q) -> Handle
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current = self.root;
        let mut bound = Handle::NIL;
        while !current.is_nil() {
            if self.key(current).borrow() > key {
                bound = current;
                current = self.left(current);
            } else {
                current = self.right(current);
            }
        }
        bound
    }

    /// Number of entries equal to `key`.
    pub(crate) fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut count = 0;
        let mut handle = self.lower_bound(key);
        while !handle.is_nil() && self.key(handle).borrow() == key {
            count += 1;
            handle = Self::next_in(&self.nodes, handle);
        }
        count
    }

    /// Unconditionally attaches a new entry after any equal keys and rebalances.
    pub(crate) fn insert_multi(&mut self, key: K, value: V) -> Handle {
        let mut parent = Handle::NIL;
        let mut current = self.root;
        let mut go_left = false;
        while !current.is_nil() {
            parent = current;
            go_left = key < *self.key(current);
            current = if go_left {
                self.left(current)
            } else {
                self.right(current)
            };
        }

        // The very first node goes in black as the root.
        let color = if parent.is_nil() { Color::Black } else { Color::Red };
        let value = self.values.alloc(value);
        let handle = self.nodes.alloc(Node::new(key, value, Links::leaf(color, parent)));
        if parent.is_nil() {
            self.root = handle;
        } else if go_left {
            self.set_left(parent, handle);
        } else {
            self.set_right(parent, handle);
        }
        self.len += 1;
        trace!("attach {handle:?} below {parent:?}");

        self.insert_fixup(handle);
        handle
    }

    /// Inserts unless an equal key exists; the existing entry is returned untouched.
    pub(crate) fn insert_unique(&mut self, key: K, value: V) -> (Handle, bool) {
        let existing = self.find(&key);
        if existing.is_nil() {
            (self.insert_multi(key, value), true)
        } else {
            (existing, false)
        }
    }

    /// Inserts, or replaces the value of an existing equal key and returns the old value.
    pub(crate) fn insert_or_assign(&mut self, key: K, value: V) -> (Handle, Option<V>) {
        let existing = self.find(&key);
        if existing.is_nil() {
            (self.insert_multi(key, value), None)
        } else {
            let old = core::mem::replace(self.value_mut(existing), value);
            (existing, Some(old))
        }
    }

    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let handle = self.find(key);
        (!handle.is_nil()).then(|| self.erase(handle))
    }

    /// Erases every entry equal to `key`; returns how many went.
    pub(crate) fn erase_all<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut erased = 0;
        loop {
            let handle = self.lower_bound(key);
            if handle.is_nil() || self.key(handle).borrow() != key {
                return erased;
            }
            self.erase(handle);
            erased += 1;
        }
    }

    /// Moves every entry of `other` into `self`.
    pub(crate) fn merge_all(&mut self, other: &mut Self) {
        debug!("merging {} entries", other.len);
        // Handles are stable across erase, so the snapshot stays valid while `other` shrinks.
        for handle in other.handles() {
            let (key, value) = other.erase(handle);
            self.insert_multi(key, value);
        }
    }

    /// Moves the entries of `other` whose keys are absent from `self`; the rest stay behind.
    pub(crate) fn merge_unique(&mut self, other: &mut Self) {
        debug!("merging up to {} entries", other.len);
        for handle in other.handles() {
            if self.find(other.key(handle)).is_nil() {
                let (key, value) = other.erase(handle);
                self.insert_multi(key, value);
            }
        }
    }
}

impl<K: Clone, V: Clone> Clone for RawRBTree<K, V> {
    /// Copies shape and colors node for node.
    fn clone(&self) -> Self {
        let mut tree = Self::with_capacity(self.len);
        if self.root.is_nil() {
            return tree;
        }

        // (source node, parent in the copy, hangs on the left)
        let mut stack: SmallVec<[(Handle, Handle, bool); 32]> = SmallVec::new();
        stack.push((self.root, Handle::NIL, false));
        while let Some((source, parent, is_left)) = stack.pop() {
            let links = *self.links(source);
            let (key, value) = self.key_value(source);
            let value = tree.values.alloc(value.clone());
            let handle = tree.nodes.alloc(Node::new(key.clone(), value, Links::leaf(links.color, parent)));
            if parent.is_nil() {
                tree.root = handle;
            } else if is_left {
                tree.set_left(parent, handle);
            } else {
                tree.set_right(parent, handle);
            }

            if !links.right.is_nil() {
                stack.push((links.right, handle, false));
            }
            if !links.left.is_nil() {
                stack.push((links.left, handle, true));
            }
        }
        tree.len = self.len;
        debug!("cloned tree of {} entries", self.len);
        tree
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use simplelog::{Config, LevelFilter, TestLogger};

    fn init_logger() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
    }

    impl<K: Ord, V> RawRBTree<K, V> {
        /// Validates the red-black invariants. Panics with a descriptive message if any are violated.
        pub(crate) fn validate_invariants(&self) {
            let mut errors: Vec<String> = Vec::new();

            if self.root.is_nil() {
                assert_eq!(self.len, 0, "Empty tree should have len 0");
                return;
            }

            // 2. The root is black and has no parent.
            if self.is_red(self.root) {
                errors.push("root is red".to_string());
            }
            if !self.parent(self.root).is_nil() {
                errors.push(alloc::format!("root {:?} has parent {:?}", self.root, self.parent(self.root)));
            }

            // 1, 3, 4 and parent links.
            let mut count = 0;
            self.validate_node(self.root, &mut count, &mut errors);

            // 5. In-order keys are non-decreasing.
            let handles = self.handles();
            for pair in handles.windows(2) {
                if self.key(pair[0]) > self.key(pair[1]) {
                    errors.push(alloc::format!("order violated between {:?} and {:?}", pair[0], pair[1]));
                }
            }

            if self.len != count || self.len != handles.len() {
                errors.push(alloc::format!(
                    "len mismatch: self.len={}, reachable={count}, in-order={}",
                    self.len,
                    handles.len()
                ));
            }

            assert!(errors.is_empty(), "Tree invariant violations:\n{}", errors.join("\n"));
        }

        /// Returns the black-height of the subtree, counting the sentinel.
        fn validate_node(&self, handle: Handle, count: &mut usize, errors: &mut Vec<String>) -> usize {
            if handle.is_nil() {
                return 1;
            }
            *count += 1;

            let left = self.left(handle);
            let right = self.right(handle);
            for child in [left, right] {
                if !child.is_nil() && self.parent(child) != handle {
                    errors.push(alloc::format!("parent link of {child:?} does not point back to {handle:?}"));
                }
            }
            if self.is_red(handle) && (self.is_red(left) || self.is_red(right)) {
                errors.push(alloc::format!("red node {handle:?} has a red child"));
            }

            let left_height = self.validate_node(left, count, errors);
            let right_height = self.validate_node(right, count, errors);
            if left_height != right_height {
                errors.push(alloc::format!(
                    "black-height mismatch below {handle:?}: left={left_height}, right={right_height}"
                ));
            }
            left_height + usize::from(self.is_black(handle))
        }

        fn keys(&self) -> Vec<&K> {
            self.handles().into_iter().map(|h| self.key(h)).collect()
        }
    }

    struct Dump<'a>(&'a RawRBTree<i32, ()>);

    impl fmt::Display for Dump<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            self.0.write_structure(f, |key, _, f| write!(f, "{key}"))
        }
    }

    fn tree_of(keys: &[i32]) -> RawRBTree<i32, ()> {
        let mut tree = RawRBTree::new();
        for &key in keys {
            tree.insert_multi(key, ());
        }
        tree
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i32),
        InsertUnique(i32),
        Remove(i32),
        EraseAll(i32),
        PopFirst,
        PopLast,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            6 => (0i32..200).prop_map(Op::Insert),
            2 => (0i32..200).prop_map(Op::InsertUnique),
            4 => (0i32..200).prop_map(Op::Remove),
            1 => (0i32..200).prop_map(Op::EraseAll),
            1 => Just(Op::PopFirst),
            1 => Just(Op::PopLast),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn tree_invariants_maintained_after_operations(ops in prop::collection::vec(op_strategy(), 0..500)) {
            init_logger();
            let mut tree: RawRBTree<i32, ()> = RawRBTree::new();
            // Sorted multiset model.
            let mut model: Vec<i32> = Vec::new();

            for op in ops {
                match op {
                    Op::Insert(key) => {
                        tree.insert_multi(key, ());
                        let at = model.partition_point(|&k| k <= key);
                        model.insert(at, key);
                    }
                    Op::InsertUnique(key) => {
                        let (_, inserted) = tree.insert_unique(key, ());
                        prop_assert_eq!(inserted, !model.contains(&key));
                        if inserted {
                            let at = model.partition_point(|&k| k < key);
                            model.insert(at, key);
                        }
                    }
                    Op::Remove(key) => {
                        let removed = tree.remove(&key).map(|(k, ())| k);
                        let expected = model.iter().position(|&k| k == key).map(|at| model.remove(at));
                        prop_assert_eq!(removed, expected);
                    }
                    Op::EraseAll(key) => {
                        let before = model.len();
                        model.retain(|&k| k != key);
                        prop_assert_eq!(tree.erase_all(&key), before - model.len());
                    }
                    Op::PopFirst => {
                        let expected = (!model.is_empty()).then(|| model.remove(0));
                        prop_assert_eq!(tree.pop_first().map(|(k, ())| k), expected);
                    }
                    Op::PopLast => {
                        prop_assert_eq!(tree.pop_last().map(|(k, ())| k), model.pop());
                    }
                }
                tree.validate_invariants();
                prop_assert_eq!(tree.keys().into_iter().copied().collect::<Vec<_>>(), model.clone());
            }
        }

        #[test]
        fn insert_then_erase_all_in_any_order_empties_tree(
            keys in prop::collection::vec(any::<i16>(), 0..300).prop_shuffle(),
            seed in any::<u64>(),
        ) {
            let mut tree: RawRBTree<i16, u64> = RawRBTree::new();
            let handles: Vec<Handle> = keys.iter().map(|&k| tree.insert_multi(k, seed)).collect();
            tree.validate_invariants();

            // Erase by handle in reverse insertion order; the other handles must stay valid.
            for (i, &handle) in handles.iter().enumerate().rev() {
                prop_assert_eq!(*tree.key(handle), keys[i]);
                let (key, value) = tree.erase(handle);
                prop_assert_eq!(key, keys[i]);
                prop_assert_eq!(value, seed);
                tree.validate_invariants();
            }
            prop_assert!(tree.is_empty());
            prop_assert!(tree.first().is_nil());
        }

        #[test]
        fn bounds_bracket_equal_runs(keys in prop::collection::vec(0i32..50, 0..200), probe in -5i32..55) {
            let tree = tree_of(&keys);
            let lower = tree.lower_bound(&probe);
            let upper = tree.upper_bound(&probe);

            let expected_count = keys.iter().filter(|&&k| k == probe).count();
            prop_assert_eq!(tree.count(&probe), expected_count);

            // Walking from lower to upper visits exactly the equal run.
            let mut walked = 0;
            let mut handle = lower;
            while handle != upper {
                prop_assert_eq!(*tree.key(handle), probe);
                walked += 1;
                handle = tree.successor(handle);
            }
            prop_assert_eq!(walked, expected_count);

            if !lower.is_nil() {
                prop_assert!(*tree.key(lower) >= probe);
                let before = tree.predecessor(lower);
                prop_assert!(before.is_nil() || *tree.key(before) < probe);
            }
            if !upper.is_nil() {
                prop_assert!(*tree.key(upper) > probe);
            }
        }

        #[test]
        fn clone_preserves_shape(keys in prop::collection::vec(any::<i32>(), 0..200)) {
            let mut tree = tree_of(&keys);
            // Punch some holes so the copy has to compact.
            for key in keys.iter().step_by(3) {
                tree.remove(key);
            }
            let copy = tree.clone();
            copy.validate_invariants();
            prop_assert_eq!(Dump(&copy).to_string(), Dump(&tree).to_string());
        }
    }

    #[test]
    fn in_order_traversal_is_sorted() {
        init_logger();
        let tree = tree_of(&[4, 7, 12, 15, 3, 5, 14, 18, 16, 17, -1]);
        tree.validate_invariants();
        assert_eq!(tree.keys(), vec![&-1, &3, &4, &5, &7, &12, &14, &15, &16, &17, &18]);
    }

    #[test]
    fn duplicates_keep_insertion_order() {
        let mut tree: RawRBTree<i32, char> = RawRBTree::new();
        for (i, value) in "abcdefghij".chars().enumerate() {
            tree.insert_multi(i32::from(i % 2 == 0), value);
        }
        tree.validate_invariants();
        let entries = tree.drain_to_vec();
        assert_eq!(
            entries,
            vec![(0, 'b'), (0, 'd'), (0, 'f'), (0, 'h'), (0, 'j'), (1, 'a'), (1, 'c'), (1, 'e'), (1, 'g'), (1, 'i')]
        );
        assert!(tree.is_empty());
        tree.validate_invariants();
    }

    #[test]
    fn insert_unique_keeps_existing_value() {
        let mut tree: RawRBTree<i32, &str> = RawRBTree::new();
        let (first, inserted) = tree.insert_unique(1, "one");
        assert!(inserted);
        let (again, inserted) = tree.insert_unique(1, "two");
        assert!(!inserted);
        assert_eq!(first, again);
        assert_eq!(*tree.value(first), "one");
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn insert_or_assign_replaces_value() {
        let mut tree: RawRBTree<i32, &str> = RawRBTree::new();
        let (handle, old) = tree.insert_or_assign(1, "one");
        assert_eq!(old, None);
        let (same, old) = tree.insert_or_assign(1, "uno");
        assert_eq!(handle, same);
        assert_eq!(old, Some("one"));
        assert_eq!(tree.key_value(handle), (&1, &"uno"));
    }

    #[test]
    fn navigation_is_a_ring_through_nil() {
        let tree = tree_of(&[2, 1, 3]);
        let first = tree.first();
        let last = tree.last();
        assert_eq!(*tree.key(first), 1);
        assert_eq!(*tree.key(last), 3);
        assert_eq!(tree.successor(Handle::NIL), first);
        assert_eq!(tree.predecessor(Handle::NIL), last);
        assert!(tree.successor(last).is_nil());
        assert!(tree.predecessor(first).is_nil());

        let empty: RawRBTree<i32, ()> = RawRBTree::new();
        assert!(empty.successor(Handle::NIL).is_nil());
        assert!(empty.predecessor(Handle::NIL).is_nil());
    }

    #[test]
    fn lower_and_upper_bound_on_duplicates() {
        let tree = tree_of(&[1, 2, 2, 2, 3]);
        let lower = tree.lower_bound(&2);
        let upper = tree.upper_bound(&2);
        assert_eq!(*tree.key(tree.predecessor(lower)), 1);
        assert_eq!(*tree.key(upper), 3);
        assert_eq!(tree.count(&2), 3);
        assert!(tree.lower_bound(&4).is_nil());
        assert!(tree.upper_bound(&3).is_nil());
        assert_eq!(tree.lower_bound(&0), tree.first());
    }

    #[test]
    fn erase_keeps_other_handles_valid() {
        init_logger();
        let mut tree: RawRBTree<i32, i32> = RawRBTree::new();
        let handles: Vec<Handle> = (0..300).map(|k| tree.insert_multi(k, k * 10)).collect();
        for (k, &handle) in handles.iter().enumerate() {
            if k % 2 == 0 {
                tree.erase(handle);
            }
        }
        tree.validate_invariants();
        for (k, &handle) in handles.iter().enumerate().skip(1).step_by(2) {
            assert_eq!(tree.key_value(handle), (&(k as i32), &(k as i32 * 10)));
        }
    }

    #[test]
    fn erase_all_removes_run() {
        let mut tree = tree_of(&[1, 1, 1, 4, 4, 3]);
        assert_eq!(tree.count(&1), 3);
        assert_eq!(tree.erase_all(&1), 3);
        assert_eq!(tree.count(&1), 0);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.erase_all(&7), 0);
        tree.validate_invariants();
    }

    #[test]
    fn merge_unique_leaves_duplicates_behind() {
        init_logger();
        let mut tree = tree_of(&[-1, 3, 2, 5, 6]);
        let mut other = tree_of(&[1, 3]);
        tree.merge_unique(&mut other);
        assert_eq!(tree.len(), 6);
        assert_eq!(other.keys(), vec![&3]);
        tree.validate_invariants();
        other.validate_invariants();
    }

    #[test]
    fn merge_all_moves_everything() {
        let mut tree = tree_of(&[1, 2, 3, 3]);
        let mut other = tree_of(&[3, 4, 1]);
        tree.merge_all(&mut other);
        assert_eq!(tree.keys(), vec![&1, &1, &2, &3, &3, &3, &4]);
        assert!(other.is_empty());
        tree.validate_invariants();
        other.validate_invariants();
    }

    #[test]
    fn structure_of_empty_tree() {
        let tree: RawRBTree<i32, ()> = RawRBTree::new();
        assert_eq!(Dump(&tree).to_string(), "N\n");
    }

    #[test]
    fn structure_shows_colors_and_sentinels() {
        let tree = tree_of(&[2, 1, 3]);
        let expected = "\
N
├──B:2
│   ├──R:1
│   │   ├──N
│   │   └──N
│   └──R:3
│       ├──N
│       └──N
";
        assert_eq!(Dump(&tree).to_string(), expected);
    }

    #[test]
    fn ascending_inserts_rotate() {
        // 1, 2, 3 in order forces a single restructuring at the root.
        let tree = tree_of(&[1, 2, 3]);
        assert_eq!(*tree.key(tree.root), 2);
        assert!(tree.is_black(tree.root));
        assert!(tree.is_red(tree.left(tree.root)));
        assert!(tree.is_red(tree.right(tree.root)));
    }

    #[test]
    fn sentinel_links_are_never_written() {
        let mut tree = tree_of(&[5, 3, 8, 1, 4]);
        for key in [3, 5, 8, 1, 4] {
            tree.remove(&key);
            assert_eq!(*tree.links(Handle::NIL), Links::NIL);
        }
        assert!(tree.root.is_nil());
    }

    #[test]
    fn clear_then_reuse() {
        let mut tree = tree_of(&[3, 1, 2]);
        tree.clear();
        assert!(tree.is_empty());
        assert!(tree.first().is_nil());
        tree.insert_multi(9, ());
        tree.validate_invariants();
        assert_eq!(tree.keys(), vec![&9]);
    }

    #[test]
    fn logged_bulk_operations_keep_invariants() {
        init_logger();
        let mut tree = tree_of(&(0..64).collect::<Vec<i32>>());
        let copy = tree.clone();
        copy.validate_invariants();

        let mut other = tree_of(&(32..96).collect::<Vec<i32>>());
        tree.merge_unique(&mut other);
        tree.validate_invariants();
        other.validate_invariants();
        assert_eq!(tree.len(), 96);
        assert_eq!(other.len(), 32);

        let entries = other.drain_to_vec();
        assert_eq!(entries.len(), 32);
        assert!(other.is_empty());
        other.validate_invariants();

        tree.clear();
        tree.validate_invariants();
        assert_eq!(copy.len(), 64);
    }
}
