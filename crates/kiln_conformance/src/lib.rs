//! Conformance test helpers for the Kiln scanning passes.
//!
//! Provides an in-memory scanner plugin whose file contents can be edited
//! between passes and which counts how often it is opened in each mode, and a
//! project builder that keeps a temporary directory, an artifact graph with
//! one product, and the pieces needed to run the automoc pass against it.

#![warn(missing_docs)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use kiln_automoc::{AutoMoc, MocRules};
use kiln_cache::{ModuleFacts, ScanDependency, ScanResultCache};
use kiln_common::{FileTime, PropertyMap};
use kiln_config::AutomocConfig;
use kiln_graph::{ArtifactId, BuildGraph, ProductId};
use kiln_scan::{ScanFlags, ScanSession, ScannerPlugin, ScannerRegistry};
use parking_lot::RwLock;
use tempfile::TempDir;

/// What the [`MemoryScanner`] reports for one path.
#[derive(Clone, Debug, Default)]
pub struct MemoryFile {
    /// Tags reported in tag mode.
    pub tags: Vec<String>,
    /// Dependencies reported in dependency mode.
    pub deps: Vec<ScanDependency>,
    /// Module facts, if the file declares or imports modules.
    pub module: Option<ModuleFacts>,
}

impl MemoryFile {
    /// A file reporting `tags` and nothing else.
    pub fn tagged(tags: &[&str]) -> Self {
        Self {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Adds a local include.
    pub fn include(mut self, path: &str) -> Self {
        self.deps.push(ScanDependency::new(path, true));
        self
    }

    /// Sets the module facts.
    pub fn module(mut self, facts: ModuleFacts) -> Self {
        self.module = Some(facts);
        self
    }
}

/// A scanner plugin answering from an editable in-memory table.
///
/// Paths not in the table cannot be opened. Every `open` is counted by mode:
/// tag mode, dependency mode, or both at once (the module scan).
pub struct MemoryScanner {
    files: RwLock<HashMap<PathBuf, MemoryFile>>,
    tag_opens: AtomicUsize,
    dependency_opens: AtomicUsize,
    module_opens: AtomicUsize,
}

impl MemoryScanner {
    /// Creates a scanner with an empty table.
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            tag_opens: AtomicUsize::new(0),
            dependency_opens: AtomicUsize::new(0),
            module_opens: AtomicUsize::new(0),
        }
    }

    /// Sets what `path` reports.
    pub fn set_file(&self, path: impl Into<PathBuf>, file: MemoryFile) {
        self.files.write().insert(path.into(), file);
    }

    /// Makes `path` unreadable.
    pub fn remove_file(&self, path: &Path) {
        self.files.write().remove(path);
    }

    /// Opens in tag mode so far.
    pub fn tag_opens(&self) -> usize {
        self.tag_opens.load(Ordering::SeqCst)
    }

    /// Opens in dependency mode so far.
    pub fn dependency_opens(&self) -> usize {
        self.dependency_opens.load(Ordering::SeqCst)
    }

    /// Opens asking for dependencies and tags together so far.
    pub fn module_opens(&self) -> usize {
        self.module_opens.load(Ordering::SeqCst)
    }
}

impl Default for MemoryScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScannerPlugin for MemoryScanner {
    fn id(&self) -> &str {
        "memory"
    }

    fn file_tags(&self) -> &[&str] {
        &["hpp", "cpp"]
    }

    fn open(&self, path: &Path, _tags: &[&str], flags: ScanFlags) -> Option<Box<dyn ScanSession>> {
        let counter = if flags.contains(ScanFlags::DEPENDENCIES | ScanFlags::FILE_TAGS) {
            &self.module_opens
        } else if flags.contains(ScanFlags::FILE_TAGS) {
            &self.tag_opens
        } else {
            &self.dependency_opens
        };
        counter.fetch_add(1, Ordering::SeqCst);

        let file = self.files.read().get(path).cloned()?;
        let tags = if flags.contains(ScanFlags::FILE_TAGS) {
            file.tags
        } else {
            Vec::new()
        };
        let deps = if flags.contains(ScanFlags::DEPENDENCIES) {
            file.deps
        } else {
            Vec::new()
        };
        Some(Box::new(MemorySession {
            tags,
            deps: deps.into_iter(),
            module: file.module,
        }))
    }
}

struct MemorySession {
    tags: Vec<String>,
    deps: std::vec::IntoIter<ScanDependency>,
    module: Option<ModuleFacts>,
}

impl ScanSession for MemorySession {
    fn additional_file_tags(&self) -> Vec<String> {
        self.tags.clone()
    }

    fn next_dependency(&mut self) -> Option<ScanDependency> {
        self.deps.next()
    }

    fn module_information(&self) -> Option<ModuleFacts> {
        self.module.clone()
    }
}

/// A registry holding only `scanner`.
pub fn memory_registry(scanner: Arc<MemoryScanner>) -> Arc<ScannerRegistry> {
    let mut registry = ScannerRegistry::new();
    registry.register(scanner);
    Arc::new(registry)
}

/// A registry holding the built-in scanners.
pub fn builtin_registry() -> Arc<ScannerRegistry> {
    Arc::new(ScannerRegistry::with_builtin())
}

/// An automoc pass with default naming and a fresh scan cache.
pub fn automoc(registry: Arc<ScannerRegistry>) -> AutoMoc {
    automoc_with_cache(registry, Arc::new(ScanResultCache::new()))
}

/// An automoc pass with default naming sharing `cache`.
pub fn automoc_with_cache(registry: Arc<ScannerRegistry>, cache: Arc<ScanResultCache>) -> AutoMoc {
    AutoMoc::new(registry, cache, AutomocConfig::default())
}

/// A temporary project with one product named `app`.
///
/// Sources live in the temporary directory; generated files go to its
/// `build` subdirectory.
pub struct TestProject {
    /// The project directory, removed on drop.
    pub dir: TempDir,
    /// The artifact graph.
    pub graph: BuildGraph,
    /// The project's only product.
    pub product: ProductId,
}

impl TestProject {
    /// Creates an empty project.
    pub fn new() -> Self {
        Self::with_properties(PropertyMap::new())
    }

    /// Creates an empty project whose product uses `properties`.
    pub fn with_properties(properties: PropertyMap) -> Self {
        let mut graph = BuildGraph::new();
        let product = graph.add_product("app", properties);
        Self {
            dir: tempfile::tempdir().expect("create project directory"),
            graph,
            product,
        }
    }

    /// Absolute path of a project file.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// The directory generated companions go to.
    pub fn out_dir(&self) -> PathBuf {
        self.dir.path().join("build")
    }

    /// Absolute path of a generated file.
    pub fn out(&self, name: &str) -> PathBuf {
        self.out_dir().join(name)
    }

    /// Writes `content` to `name` and registers it with `tags`, modified at
    /// `ts`. An already registered file keeps its tags and only gets the new
    /// timestamp.
    pub fn write(&mut self, name: &str, content: &str, tags: &[&str], ts: u64) -> ArtifactId {
        let path = self.path(name);
        std::fs::write(&path, content).expect("write project file");
        self.register(path, tags, ts)
    }

    /// Registers `name` without touching the disk.
    pub fn register_virtual(&mut self, name: &str, tags: &[&str], ts: u64) -> ArtifactId {
        let path = self.path(name);
        self.register(path, tags, ts)
    }

    fn register(&mut self, path: PathBuf, tags: &[&str], ts: u64) -> ArtifactId {
        match self.graph.find(&path) {
            Some(id) => {
                if let Some(artifact) = self.graph.get_mut(id) {
                    artifact.timestamp = FileTime::from_nanos(ts);
                }
                id
            }
            None => self
                .graph
                .add_source(self.product, path, tags, FileTime::from_nanos(ts))
                .expect("register project file"),
        }
    }

    /// Reference rules writing into [`out_dir`](Self::out_dir).
    pub fn rules(&self) -> MocRules {
        MocRules::new(AutomocConfig::default(), self.out_dir())
    }

    /// The artifact at a generated path, if it exists.
    pub fn generated(&self, name: &str) -> Option<ArtifactId> {
        self.graph.find(&self.out(name))
    }

    /// Sorted tag names of `id`.
    pub fn tags_of(&self, id: ArtifactId) -> Vec<String> {
        self.graph.tag_names(id)
    }

    /// Returns `true` if `parent` consumes `child`.
    pub fn is_connected(&self, parent: ArtifactId, child: ArtifactId) -> bool {
        self.graph
            .get(child)
            .is_some_and(|c| c.parents().contains(&parent))
            && self
                .graph
                .get(parent)
                .is_some_and(|p| p.children().contains(&child))
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_scanner_counts_by_mode() {
        let scanner = MemoryScanner::new();
        scanner.set_file("/src/a.hpp", MemoryFile::tagged(&["moc_hpp"]).include("b.h"));

        let session = scanner
            .open(Path::new("/src/a.hpp"), &["hpp"], ScanFlags::FILE_TAGS)
            .unwrap();
        assert_eq!(session.additional_file_tags(), vec!["moc_hpp"]);

        let mut session = scanner
            .open(Path::new("/src/a.hpp"), &[], ScanFlags::DEPENDENCIES)
            .unwrap();
        assert_eq!(session.next_dependency(), Some(ScanDependency::new("b.h", true)));
        assert!(session.additional_file_tags().is_empty());

        assert_eq!(scanner.tag_opens(), 1);
        assert_eq!(scanner.dependency_opens(), 1);
        assert_eq!(scanner.module_opens(), 0);
    }

    #[test]
    fn unknown_path_cannot_be_opened() {
        let scanner = MemoryScanner::new();
        assert!(scanner
            .open(Path::new("/missing.hpp"), &[], ScanFlags::DEPENDENCIES)
            .is_none());
        assert_eq!(scanner.dependency_opens(), 1);
    }

    #[test]
    fn project_reregistration_keeps_identity() {
        let mut project = TestProject::new();
        let first = project.write("a.hpp", "", &["hpp"], 1);
        let second = project.write("a.hpp", "// edited", &["hpp"], 5);
        assert_eq!(first, second);
        assert_eq!(project.graph.get(first).unwrap().timestamp, FileTime::from_nanos(5));
    }
}
