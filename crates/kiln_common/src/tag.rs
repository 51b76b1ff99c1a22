//! Interned file tags for cheap copying and O(1) membership tests.

use std::collections::BTreeSet;

use lasso::ThreadedRodeo;

/// A classification label attached to an artifact (e.g. `hpp`, `moc_cpp`).
///
/// Tags are interned strings represented as a `u32` index into a
/// [`TagInterner`]. Tag sets are tested for membership on every artifact the
/// engine looks at, so equality and hashing never touch the string itself.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct FileTag(u32);

impl FileTag {
    /// Creates a `FileTag` from a raw `u32` index.
    ///
    /// Only meaningful for the interner that produced the index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index of this tag.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

// SAFETY: `FileTag` wraps a `u32` which is always a valid `usize` on 32-bit and
// 64-bit platforms. `try_from_usize` rejects values that don't fit in `u32`.
unsafe impl lasso::Key for FileTag {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(FileTag)
    }
}

/// The set of tags carried by one artifact.
///
/// Ordered by interned index, which keeps iteration deterministic within one
/// interner without caring about insertion order.
pub type FileTags = BTreeSet<FileTag>;

/// Thread-safe tag interner backed by [`lasso::ThreadedRodeo`].
///
/// One interner is shared by a build graph and every component that compares
/// tags against it. Scanner threads intern newly discovered tags concurrently.
pub struct TagInterner {
    rodeo: ThreadedRodeo<FileTag>,
}

impl TagInterner {
    /// Creates a new empty interner.
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Interns a tag name, returning the existing [`FileTag`] if it is known.
    pub fn intern(&self, name: &str) -> FileTag {
        self.rodeo.get_or_intern(name)
    }

    /// Looks up a tag without interning it.
    pub fn get(&self, name: &str) -> Option<FileTag> {
        self.rodeo.get(name)
    }

    /// Resolves a [`FileTag`] back to its name.
    ///
    /// # Panics
    ///
    /// Panics if the tag was not created by this interner.
    pub fn resolve(&self, tag: FileTag) -> &str {
        self.rodeo.resolve(&tag)
    }

    /// Interns every name and collects the result into a tag set.
    pub fn tags<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> FileTags {
        names.into_iter().map(|n| self.intern(n)).collect()
    }

    /// Resolves a tag set to its names, sorted alphabetically.
    pub fn names(&self, tags: &FileTags) -> Vec<String> {
        let mut names: Vec<String> = tags.iter().map(|t| self.resolve(*t).to_string()).collect();
        names.sort();
        names
    }
}

impl Default for TagInterner {
    fn default() -> Self {
        Self::new()
    }
}
