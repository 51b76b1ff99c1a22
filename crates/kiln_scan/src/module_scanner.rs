//! C++20 module fact extraction backed by the project-wide store.

use std::sync::Arc;

use kiln_cache::{ModuleFacts, RawScanResults, ScanDependency, ScannerId, ScannerIdentity};
use kiln_common::{FileTime, InternalError, PropertyMap};
use kiln_graph::{ArtifactId, BuildGraph, ProductId};
use rayon::prelude::*;
use tracing::trace;

use crate::error::ScanError;
use crate::plugin::{ScanFlags, ScannerPlugin};
use crate::registry::ScannerRegistry;

const CPP_TAG: &str = "cpp";
const COMBINE_TAG: &str = "cpp.combine";

/// Store identity of the module scanner wrapping one plugin.
///
/// Module facts do not depend on build properties, so every property map is
/// compatible and one entry serves all configurations of a file.
struct ModulesIdentity {
    id: ScannerId,
}

impl ModulesIdentity {
    fn for_plugin(plugin: &dyn ScannerPlugin) -> Self {
        Self {
            id: ScannerId::new(format!("cxx20modules{}", plugin.id())),
        }
    }
}

impl ScannerIdentity for ModulesIdentity {
    fn id(&self) -> ScannerId {
        self.id.clone()
    }

    fn are_properties_compatible(&self, _cached: &PropertyMap, _current: &PropertyMap) -> bool {
        true
    }
}

/// Computes module facts for compiled-unit artifacts.
pub struct CxxModulesScanner {
    registry: Arc<ScannerRegistry>,
    store: Arc<RawScanResults>,
}

impl CxxModulesScanner {
    /// Creates a scanner over the shared registry and store.
    pub fn new(registry: Arc<ScannerRegistry>, store: Arc<RawScanResults>) -> Self {
        Self { registry, store }
    }

    fn plugin(&self) -> Result<&Arc<dyn ScannerPlugin>, ScanError> {
        match self.registry.scanners_for_tag(CPP_TAG) {
            [only] => Ok(only),
            others => Err(ScanError::ScannerCount {
                tag: CPP_TAG.to_string(),
                count: others.len(),
            }),
        }
    }

    /// Returns the module facts of `artifact`, recomputing them if the file
    /// changed since the stored scan.
    pub fn scan(&self, graph: &BuildGraph, artifact: ArtifactId) -> Result<ModuleFacts, ScanError> {
        self.scan_at(graph, artifact, FileTime::current_time())
    }

    /// Like [`scan`](Self::scan), recording a fresh scan at `now`.
    pub fn scan_at(
        &self,
        graph: &BuildGraph,
        artifact: ArtifactId,
        now: FileTime,
    ) -> Result<ModuleFacts, ScanError> {
        let plugin = self.plugin()?;
        let node = graph
            .get(artifact)
            .ok_or_else(|| InternalError::new(format!("artifact {artifact} does not exist")))?;
        let empty = PropertyMap::new();
        let properties = graph
            .product(node.product)
            .map(|p| &p.properties)
            .unwrap_or(&empty);

        let identity = ModulesIdentity::for_plugin(plugin.as_ref());
        let handle = self.store.find_scan_data(&node.path, &identity, properties);
        let previous = {
            let data = handle.read();
            if !data.is_stale(node.timestamp) {
                return Ok(data.raw.module_facts.clone());
            }
            data.raw.module_facts.clone()
        };

        // The plugin runs unlocked; readers keep seeing the previous facts.
        let tags = scanner_tags(graph.interner().names(&node.file_tags));
        let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();
        trace!(path = %node.path.display(), "scanning module facts");
        let Some(mut session) = plugin.open(
            &node.path,
            &tag_refs,
            ScanFlags::DEPENDENCIES | ScanFlags::FILE_TAGS,
        ) else {
            return Ok(previous);
        };
        let Some(facts) = session.module_information() else {
            return Ok(previous);
        };
        let mut deps: Vec<ScanDependency> = Vec::new();
        while let Some(dep) = session.next_dependency() {
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }
        let additional_file_tags = session.additional_file_tags();
        drop(session);

        let mut data = handle.write();
        if !data.is_stale(node.timestamp) {
            trace!(path = %node.path.display(), "module facts stored by a concurrent scan");
            return Ok(data.raw.module_facts.clone());
        }
        data.raw.deps = deps;
        data.raw.additional_file_tags = additional_file_tags;
        data.raw.module_facts = facts;
        data.last_scan_time = now;
        Ok(data.raw.module_facts.clone())
    }

    /// Scans every compiled unit of `product` in parallel.
    ///
    /// Results are in the product's artifact order.
    pub fn scan_product(
        &self,
        graph: &BuildGraph,
        product: ProductId,
        now: FileTime,
    ) -> Result<Vec<(ArtifactId, ModuleFacts)>, ScanError> {
        let interner = graph.interner();
        let unit_tags: Vec<_> = [CPP_TAG, COMBINE_TAG]
            .iter()
            .filter_map(|t| interner.get(t))
            .collect();
        let units: Vec<ArtifactId> = graph
            .product_artifacts(product)
            .into_iter()
            .filter(|id| graph.get(*id).is_some_and(|a| a.has_any_tag(&unit_tags)))
            .collect();

        units
            .par_iter()
            .map(|&id| self.scan_at(graph, id, now).map(|facts| (id, facts)))
            .collect()
    }
}

/// The tag names shown to the plugin, with `cpp.combine` swapped for `cpp`.
fn scanner_tags(mut names: Vec<String>) -> Vec<String> {
    if let Some(pos) = names.iter().position(|n| n == COMBINE_TAG) {
        names.remove(pos);
        if !names.iter().any(|n| n == CPP_TAG) {
            names.push(CPP_TAG.to_string());
        }
    }
    names
}
