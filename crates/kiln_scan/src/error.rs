//! Error types for scanning.

use kiln_common::InternalError;

/// Errors reported by the scanners in this crate.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// No scanner plugin handles a tag the caller requires.
    #[error("no scanner registered for file tag '{tag}' (needed to scan {artifact_type} files)")]
    NoScanner {
        /// The primary tag that has no scanner.
        tag: String,
        /// The kind of artifact that was being scanned.
        artifact_type: String,
    },

    /// The module scanner needs exactly one plugin for its tag.
    #[error("there are {count} scanners for the file tag {tag}, expected is exactly one")]
    ScannerCount {
        /// The tag that was looked up.
        tag: String,
        /// How many plugins were registered for it.
        count: usize,
    },

    /// Module imports form a cycle.
    #[error("module dependency cycle involving '{module}'")]
    ModuleCycle {
        /// A module on the cycle.
        module: String,
    },

    /// An artifact id did not resolve.
    #[error(transparent)]
    Internal(#[from] InternalError),
}
