//! Dynamic graph mutation driven by meta-object macros.
//!
//! [`AutoMoc`] scans a product's C++ sources once per pass. A header or
//! source that gained a meta-object macro is handed to a [`RulesApplicator`]
//! so a generated companion can be instantiated; one that lost its macro has
//! the companion (and, for headers, the object compiled from it) removed from
//! the graph directly.

#![warn(missing_docs)]

pub mod automoc;
pub mod error;
pub mod file_type;
pub mod moc_rules;
pub mod observer;
pub mod rules;
pub mod tags;

pub use automoc::{AutoMoc, PassReport};
pub use error::{AutomocError, RuleError};
pub use file_type::FileType;
pub use moc_rules::MocRules;
pub use observer::{PassObserver, RecordingObserver, TracingObserver};
pub use rules::{ArtifactsPerFileTag, RulesApplicator};
pub use tags::AutomocTags;
