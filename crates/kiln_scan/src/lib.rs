//! Content scanners for dependency, tag, and module discovery.
//!
//! Scanners are plugins implementing [`ScannerPlugin`], registered by file
//! tag in a [`ScannerRegistry`] built once at engine start-up. Two consumers
//! sit on top of the registry:
//!
//! - [`TagScanner`] derives file tags from content and collects raw include
//!   dependencies through the per-invocation [`ScanResultCache`](kiln_cache::ScanResultCache).
//! - [`CxxModulesScanner`] extracts C++ module facts through the project-wide
//!   [`RawScanResults`](kiln_cache::RawScanResults) store.

#![warn(missing_docs)]

pub mod cpp;
pub mod error;
pub mod module_order;
pub mod module_scanner;
pub mod plugin;
pub mod registry;
pub mod tag_scanner;

#[cfg(test)]
mod testing;

pub use cpp::CppScanner;
pub use error::ScanError;
pub use module_order::module_build_order;
pub use module_scanner::CxxModulesScanner;
pub use plugin::{ScanFlags, ScanSession, ScannerPlugin};
pub use registry::{register_builtin_scanners, ScannerRegistry};
pub use tag_scanner::{TagScanOutput, TagScanner};
