use super::handle::Handle;

/// Node color. The sentinel is always `Black`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Color {
    Red,
    Black,
}

/// Structural part of a node: color plus non-owning parent/child links.
///
/// A missing parent or child is `Handle::NIL`, never an `Option`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Links {
    pub(crate) color: Color,
    pub(crate) parent: Handle,
    pub(crate) left: Handle,
    pub(crate) right: Handle,
}

impl Links {
    /// Links of the sentinel.
    pub(crate) const NIL: Self = Self {
        color: Color::Black,
        parent: Handle::NIL,
        left: Handle::NIL,
        right: Handle::NIL,
    };

    pub(crate) const fn leaf(color: Color, parent: Handle) -> Self {
        Self {
            color,
            parent,
            left: Handle::NIL,
            right: Handle::NIL,
        }
    }
}

// Keys live with the links so descent touches one slot per level; values sit in their own
// arena so `IterMut` can hand out `&mut V` while links are still being read.
pub(crate) struct Node<K> {
    links: Links,
    key: K,
    value: Handle,
}

impl<K> Node<K> {
    pub(crate) const fn new(key: K, value: Handle, links: Links) -> Self {
        Self { links, key, value }
    }

    #[inline]
    pub(crate) const fn links(&self) -> &Links {
        &self.links
    }

    #[inline]
    pub(crate) const fn links_mut(&mut self) -> &mut Links {
        &mut self.links
    }

    #[inline]
    pub(crate) const fn key(&self) -> &K {
        &self.key
    }

    /// Handle of this node's value in the value arena.
    #[inline]
    pub(crate) const fn value(&self) -> Handle {
        self.value
    }

    pub(crate) fn into_key(self) -> K {
        self.key
    }
}
