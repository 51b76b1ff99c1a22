//! Registry of scanner plugins keyed by file tag.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cpp::CppScanner;
use crate::plugin::ScannerPlugin;

/// Scanner plugins indexed by the file tags they handle.
///
/// Built once when the engine starts and shared by reference afterwards.
#[derive(Default)]
pub struct ScannerRegistry {
    plugins: Vec<Arc<dyn ScannerPlugin>>,
    by_tag: HashMap<String, Vec<Arc<dyn ScannerPlugin>>>,
}

impl ScannerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in scanners.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        register_builtin_scanners(&mut registry);
        registry
    }

    /// Registers a plugin under every tag it reports.
    pub fn register(&mut self, plugin: Arc<dyn ScannerPlugin>) {
        for tag in plugin.file_tags() {
            self.by_tag
                .entry((*tag).to_string())
                .or_default()
                .push(Arc::clone(&plugin));
        }
        self.plugins.push(plugin);
    }

    /// Plugins registered for `tag`, in registration order.
    pub fn scanners_for_tag(&self, tag: &str) -> &[Arc<dyn ScannerPlugin>] {
        self.by_tag.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` if no plugin is registered.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// Registers the built-in C/C++ scanner.
pub fn register_builtin_scanners(registry: &mut ScannerRegistry) {
    registry.register(Arc::new(CppScanner::new()));
}
