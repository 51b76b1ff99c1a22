//! Implementation of the `kiln scan` command.
//!
//! Runs one automoc pass over the project's product with the reference moc
//! rules and prints which companions the pass requested, created, and
//! retracted.

use std::path::PathBuf;
use std::sync::Arc;

use kiln_automoc::{AutoMoc, MocRules, PassReport};
use kiln_cache::ScanResultCache;
use kiln_graph::BuildGraph;
use kiln_scan::ScannerRegistry;

use crate::pipeline::{build_graph, load_project};
use crate::{GlobalArgs, ReportFormat, ScanArgs};

/// Runs the scan command.
///
/// Returns exit code 0 when the pass completes.
pub fn run(args: &ScanArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (root, config) = load_project(global)?;
    let output_dir = match args.output_dir {
        Some(ref dir) => root.join(dir),
        None => root.join(&config.scan.cache_dir).join("generated"),
    };

    let (mut graph, product) = build_graph(&root, &config)?;
    let pass = AutoMoc::new(
        Arc::new(ScannerRegistry::with_builtin()),
        Arc::new(ScanResultCache::new()),
        config.automoc.clone(),
    );
    let mut rules = MocRules::new(config.automoc.clone(), output_dir);
    let report = pass.apply(&mut graph, product, &mut rules)?;

    if !global.quiet {
        match args.format {
            ReportFormat::Text => {
                for line in render_text(&graph, &report, &rules) {
                    println!("{line}");
                }
            }
            ReportFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&render_json(&graph, &report, &rules))?);
            }
        }
    }
    Ok(0)
}

fn path_of(graph: &BuildGraph, id: kiln_graph::ArtifactId) -> PathBuf {
    graph.get(id).map(|a| a.path.clone()).unwrap_or_default()
}

/// Human-readable pass summary, one line per fact.
fn render_text(graph: &BuildGraph, report: &PassReport, rules: &MocRules) -> Vec<String> {
    let mut lines = Vec::new();
    for (&tag, inputs) in &report.batch {
        let tag = graph.interner().resolve(tag);
        for &input in inputs {
            lines.push(format!("{tag:<14} {}", path_of(graph, input).display()));
        }
    }
    for &id in rules.created() {
        lines.push(format!("{:<14} {}", "generated", path_of(graph, id).display()));
    }
    for path in &report.retracted {
        lines.push(format!("{:<14} {}", "retracted", path.display()));
    }
    if let Some(header) = report.plugin_header {
        lines.push(format!("{:<14} {}", "plugin header", path_of(graph, header).display()));
    }
    lines.push(format!(
        "scanned {} file(s), {} companion(s) generated, {} artifact(s) retracted",
        report.scanned.len(),
        rules.created().len(),
        report.retracted.len()
    ));
    lines
}

fn render_json(graph: &BuildGraph, report: &PassReport, rules: &MocRules) -> serde_json::Value {
    let batch: serde_json::Map<String, serde_json::Value> = report
        .batch
        .iter()
        .map(|(&tag, inputs)| {
            let paths: Vec<String> = inputs
                .iter()
                .map(|&id| path_of(graph, id).display().to_string())
                .collect();
            (graph.interner().resolve(tag).to_string(), serde_json::json!(paths))
        })
        .collect();
    let generated: Vec<String> = rules
        .created()
        .iter()
        .map(|&id| path_of(graph, id).display().to_string())
        .collect();
    let retracted: Vec<String> = report
        .retracted
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    serde_json::json!({
        "scanned": report.scanned.len(),
        "batch": batch,
        "generated": generated,
        "retracted": retracted,
        "plugin_header": report
            .plugin_header
            .map(|id| path_of(graph, id).display().to_string()),
    })
}
