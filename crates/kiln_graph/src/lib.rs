//! The artifact graph mutated by the scanning and automoc passes.
//!
//! Artifacts live in a generational [`Arena`] and are addressed by
//! [`ArtifactId`]. Parent edges point at consumers (artifacts built from this
//! one), child edges at inputs. Removing an artifact detaches it from both
//! sides and kills its id, so stale ids resolve to `None` instead of to a
//! recycled slot.

#![warn(missing_docs)]

pub mod arena;
pub mod artifact;
pub mod graph;
pub mod ids;
pub mod product;

pub use arena::{Arena, ArenaId};
pub use artifact::{base_name, file_name, Artifact, ArtifactKind};
pub use graph::BuildGraph;
pub use ids::{ArtifactId, ProductId};
pub use product::Product;
