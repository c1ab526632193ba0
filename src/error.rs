use core::fmt;

/// Errors returned by the checked accessors of the collections in this crate.
///
/// # Examples
///
/// ```
/// use rb_collections::{Error, RBTreeMap};
///
/// let map: RBTreeMap<i32, &str> = RBTreeMap::new();
/// assert_eq!(map.at(&1), Err(Error::KeyNotFound));
/// assert_eq!(Error::KeyNotFound.to_string(), "the entry does not exist");
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum Error {
    /// No entry with the requested key exists.
    KeyNotFound,
}

impl Error {
    /// Returns a static description of the error.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::KeyNotFound => "the entry does not exist",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::error::Error for Error {}
