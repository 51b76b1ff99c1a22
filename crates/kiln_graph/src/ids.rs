//! Opaque generational ID newtypes for graph entities.

use std::fmt;

use crate::arena::ArenaId;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        pub struct $name {
            index: u32,
            generation: u32,
        }

        impl ArenaId for $name {
            fn from_parts(index: u32, generation: u32) -> Self {
                Self { index, generation }
            }

            fn index(self) -> u32 {
                self.index
            }

            fn generation(self) -> u32 {
                self.generation
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}v{}", $prefix, self.index, self.generation)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for an artifact in the [`BuildGraph`](crate::BuildGraph).
    ArtifactId,
    "a"
);

define_id!(
    /// Opaque, copyable ID for a product.
    ProductId,
    "p"
);
