//! Value types produced by content scanners.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a scanner, used as part of every cache key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct ScannerId(String);

impl ScannerId {
    /// Creates a scanner id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScannerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A raw textual dependency found by content inspection.
///
/// The path is kept exactly as written in the source (`"moc_widget.cpp"`,
/// `<QObject>`), whether or not a graph artifact exists for it.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ScanDependency {
    /// The included path as written.
    pub file_path: String,
    /// `true` for quoted includes, `false` for angle-bracket includes.
    pub is_local: bool,
}

impl ScanDependency {
    /// Creates a dependency record.
    pub fn new(file_path: impl Into<String>, is_local: bool) -> Self {
        Self {
            file_path: file_path.into(),
            is_local,
        }
    }
}

/// The dependency list one scanner produced for one file.
///
/// `valid == false` means the result must be recomputed.
#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ScanResult {
    /// Whether the dependency list is usable.
    pub valid: bool,
    /// Dependencies in discovery order, without duplicates.
    pub deps: Vec<ScanDependency>,
}

impl ScanResult {
    /// An empty, valid result.
    pub fn empty_valid() -> Self {
        Self {
            valid: true,
            deps: Vec::new(),
        }
    }

    /// Appends a dependency unless an identical one is already recorded.
    pub fn add_dependency(&mut self, dep: ScanDependency) {
        if !self.deps.contains(&dep) {
            self.deps.push(dep);
        }
    }
}

/// Module export/import relationships of one translation unit.
#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ModuleFacts {
    /// The module this unit implements, for implementation units and partitions.
    pub belongs_to_module: Option<String>,
    /// The module (or `module:partition`) this unit exports.
    pub exports_module: Option<String>,
    /// Named modules imported by this unit, in source order.
    pub imports_modules: Vec<String>,
    /// Partitions imported by this unit, in source order.
    pub imports_submodules: Vec<String>,
}

impl ModuleFacts {
    /// Returns `true` if the unit neither declares nor imports any module.
    pub fn is_empty(&self) -> bool {
        self.belongs_to_module.is_none()
            && self.exports_module.is_none()
            && self.imports_modules.is_empty()
            && self.imports_submodules.is_empty()
    }
}

/// Everything a scanner reported about a file, as stored project-wide.
#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct RawScanResult {
    /// Raw dependencies.
    pub deps: Vec<ScanDependency>,
    /// Tags the scanner derived from the content.
    pub additional_file_tags: Vec<String>,
    /// Module facts, empty for units without module declarations.
    pub module_facts: ModuleFacts,
}
