//! Shared foundational types used across the Kiln build engine.
//!
//! This crate provides interned file tags, file timestamps, content hashing,
//! property maps with compatibility fingerprints, and the internal error type.

#![warn(missing_docs)]

pub mod hash;
pub mod properties;
pub mod result;
pub mod tag;
pub mod time;

pub use hash::ContentHash;
pub use properties::PropertyMap;
pub use result::{InternalError, KilnResult};
pub use tag::{FileTag, FileTags, TagInterner};
pub use time::FileTime;
