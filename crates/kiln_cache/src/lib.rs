//! Scan-result caching for incremental dependency scanning.
//!
//! Two caches live here. [`ScanResultCache`] remembers the raw include list a
//! scanner produced for a file during one build invocation. [`RawScanResults`]
//! is the project-wide store keyed by file, scanner, and compatible property
//! set; it holds module facts and can be persisted between invocations.

#![warn(missing_docs)]

pub mod error;
pub mod persist;
pub mod raw_scan_results;
pub mod scan_cache;
pub mod types;

pub use error::CacheError;
pub use persist::STORE_FILE;
pub use raw_scan_results::{RawScanResults, ScanData, ScanDataHandle, ScannerIdentity};
pub use scan_cache::ScanResultCache;
pub use types::{ModuleFacts, RawScanResult, ScanDependency, ScanResult, ScannerId};
