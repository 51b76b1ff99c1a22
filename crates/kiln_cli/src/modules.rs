//! Implementation of the `kiln modules` command.

use std::sync::Arc;

use kiln_cache::{ModuleFacts, RawScanResults};
use kiln_common::FileTime;
use kiln_graph::{ArtifactId, BuildGraph};
use kiln_scan::{module_build_order, CxxModulesScanner, ScannerRegistry};
use tracing::warn;

use crate::pipeline::{build_graph, load_project};
use crate::{GlobalArgs, ModulesArgs, ReportFormat};

const KILN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runs the modules command.
///
/// Scans every compiled unit for module facts, reusing persisted results for
/// unchanged files, prints the units in build order, and saves the store.
pub fn run(args: &ModulesArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (root, config) = load_project(global)?;
    let cache_dir = root.join(&config.scan.cache_dir);
    let (graph, product) = build_graph(&root, &config)?;

    let store = if args.fresh {
        RawScanResults::new()
    } else {
        RawScanResults::load(&cache_dir, KILN_VERSION)
    };
    let store = Arc::new(store);
    let scanner = CxxModulesScanner::new(Arc::new(ScannerRegistry::with_builtin()), Arc::clone(&store));
    let facts = scanner.scan_product(&graph, product, FileTime::current_time())?;
    let order = module_build_order(&facts)?;

    if let Err(e) = store.save(&cache_dir, KILN_VERSION) {
        warn!("scan results were not saved: {e}");
    }

    if !global.quiet {
        match args.format {
            ReportFormat::Text => {
                for line in render_text(&graph, &facts, &order) {
                    println!("{line}");
                }
            }
            ReportFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&render_json(&graph, &facts, &order))?);
            }
        }
    }
    Ok(0)
}

fn facts_of(facts: &[(ArtifactId, ModuleFacts)], id: ArtifactId) -> Option<&ModuleFacts> {
    facts.iter().find(|(a, _)| *a == id).map(|(_, f)| f)
}

fn display_path(graph: &BuildGraph, id: ArtifactId) -> String {
    graph
        .get(id)
        .map(|a| a.path.display().to_string())
        .unwrap_or_else(|| id.to_string())
}

fn render_text(graph: &BuildGraph, facts: &[(ArtifactId, ModuleFacts)], order: &[ArtifactId]) -> Vec<String> {
    let mut lines = Vec::new();
    for (index, &id) in order.iter().enumerate() {
        let mut line = format!("{:>3}. {}", index + 1, display_path(graph, id));
        if let Some(f) = facts_of(facts, id) {
            if let Some(ref exported) = f.exports_module {
                line.push_str(&format!(" exports {exported}"));
            } else if let Some(ref owner) = f.belongs_to_module {
                line.push_str(&format!(" implements {owner}"));
            }
            let imports: Vec<&str> = f
                .imports_modules
                .iter()
                .chain(&f.imports_submodules)
                .map(String::as_str)
                .collect();
            if !imports.is_empty() {
                line.push_str(&format!(" imports {}", imports.join(", ")));
            }
        }
        lines.push(line);
    }
    lines
}

fn render_json(graph: &BuildGraph, facts: &[(ArtifactId, ModuleFacts)], order: &[ArtifactId]) -> serde_json::Value {
    let units: Vec<serde_json::Value> = order
        .iter()
        .map(|&id| {
            let f = facts_of(facts, id).cloned().unwrap_or_default();
            serde_json::json!({
                "path": display_path(graph, id),
                "belongs_to_module": f.belongs_to_module,
                "exports_module": f.exports_module,
                "imports_modules": f.imports_modules,
                "imports_submodules": f.imports_submodules,
            })
        })
        .collect();
    serde_json::json!({ "units": units })
}
