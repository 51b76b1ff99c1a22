//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur while persisting or restoring scan results.
///
/// Loading is fail-safe: every variant other than `Io` on save turns into a
/// cache miss at the call site. The enum exists so the reason can be logged.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The persisted store has an invalid or missing header.
    #[error("invalid scan store header in {path}: {reason}")]
    InvalidHeader {
        /// The store file path.
        path: PathBuf,
        /// Description of the header problem.
        reason: String,
    },

    /// The stored checksum does not match the payload.
    #[error("checksum mismatch in {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The store file path.
        path: PathBuf,
        /// The checksum recorded in the header.
        expected: String,
        /// The checksum of the payload on disk.
        actual: String,
    },

    /// The store was written by an incompatible format or tool version.
    #[error("version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The store file path.
        path: PathBuf,
        /// The version this build understands.
        expected: String,
        /// The version found in the file.
        actual: String,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}
