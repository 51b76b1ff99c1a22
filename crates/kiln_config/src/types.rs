//! Configuration types deserialized from `kiln.toml`.

use std::path::PathBuf;

use serde::Deserialize;

/// The top-level project configuration parsed from `kiln.toml`.
#[derive(Debug, Deserialize)]
pub struct KilnConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
    /// Scanner threading and cache location.
    #[serde(default)]
    pub scan: ScanConfig,
    /// Companion file naming for the automoc pass.
    #[serde(default)]
    pub automoc: AutomocConfig,
    /// Default log filter.
    #[serde(default)]
    pub log: LogConfig,
}

/// Core project metadata required in every `kiln.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name, also used as the product name.
    pub name: String,
    /// The project version string.
    #[serde(default)]
    pub version: Option<String>,
}

/// Scanner settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Size of the scanning thread pool. Defaults to the number of CPUs.
    #[serde(default)]
    pub threads: Option<usize>,
    /// Directory holding persisted scan results, relative to the project root.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            threads: None,
            cache_dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".kiln-cache")
}

/// Naming of generated companion files.
///
/// A header `widget.hpp` gets `<header_prefix>widget.<header_extension>`; a
/// source `main.cpp` gets `main.<source_extension>`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AutomocConfig {
    /// Prefix of companions generated for headers.
    #[serde(default = "default_header_prefix")]
    pub header_prefix: String,
    /// Extension of companions generated for headers.
    #[serde(default = "default_header_extension")]
    pub header_extension: String,
    /// Extension of companions generated for sources.
    #[serde(default = "default_source_extension")]
    pub source_extension: String,
    /// Extension of object files compiled from header companions.
    #[serde(default = "default_object_extension")]
    pub object_extension: String,
}

impl Default for AutomocConfig {
    fn default() -> Self {
        Self {
            header_prefix: default_header_prefix(),
            header_extension: default_header_extension(),
            source_extension: default_source_extension(),
            object_extension: default_object_extension(),
        }
    }
}

fn default_header_prefix() -> String {
    "moc_".to_string()
}

fn default_header_extension() -> String {
    "cpp".to_string()
}

fn default_source_extension() -> String {
    "moc".to_string()
}

fn default_object_extension() -> String {
    "o".to_string()
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}
