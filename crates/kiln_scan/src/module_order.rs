//! Build order of module units derived from their facts.

use std::collections::HashMap;

use kiln_cache::ModuleFacts;
use kiln_graph::ArtifactId;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::ScanError;

/// Orders units so that every exporter precedes its importers.
///
/// Edges run from the unit exporting a module (or partition) to each unit
/// importing it, and from a primary interface to the implementation units
/// that belong to it. Imports nobody in `units` exports, such as `std`, are
/// ignored. Fails with [`ScanError::ModuleCycle`] if imports are circular.
pub fn module_build_order(units: &[(ArtifactId, ModuleFacts)]) -> Result<Vec<ArtifactId>, ScanError> {
    let mut graph: DiGraph<ArtifactId, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = units.iter().map(|(id, _)| graph.add_node(*id)).collect();

    let mut exporters: HashMap<&str, NodeIndex> = HashMap::new();
    for ((_, facts), node) in units.iter().zip(&nodes) {
        if let Some(name) = facts.exports_module.as_deref() {
            exporters.insert(name, *node);
        }
    }

    for ((_, facts), &node) in units.iter().zip(&nodes) {
        let mut required: Vec<&str> = facts
            .imports_modules
            .iter()
            .chain(&facts.imports_submodules)
            .map(String::as_str)
            .collect();
        if facts.exports_module.is_none() {
            required.extend(facts.belongs_to_module.as_deref());
        }
        for module in required {
            if let Some(&exporter) = exporters.get(module) {
                if exporter != node {
                    graph.update_edge(exporter, node, ());
                }
            }
        }
    }

    toposort(&graph, None)
        .map(|order| order.into_iter().map(|n| graph[n]).collect())
        .map_err(|cycle| {
            let node = cycle.node_id();
            let index = node.index();
            let module = units[index]
                .1
                .exports_module
                .clone()
                .unwrap_or_else(|| units[index].0.to_string());
            ScanError::ModuleCycle { module }
        })
}
