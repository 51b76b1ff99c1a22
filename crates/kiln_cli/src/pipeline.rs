//! Shared pipeline helpers for CLI commands.
//!
//! Contains the steps common to `scan` and `modules`: project root
//! resolution, logging and thread-pool setup, source discovery, and building
//! the artifact graph for the project's single product.

use std::path::{Path, PathBuf};

use kiln_common::{FileTime, PropertyMap};
use kiln_config::{load_config, KilnConfig, CONFIG_FILE};
use kiln_graph::{BuildGraph, ProductId};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing `kiln.toml`.
///
/// Returns the directory containing `kiln.toml`, or an error if none is found.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir → itself).
/// Otherwise walks up from the current directory looking for `kiln.toml`.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            Ok(p.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")))
        } else {
            Ok(p)
        }
    } else {
        find_project_root(&std::env::current_dir()?)
    }
}

/// Loads the project and prepares logging and the scanning thread pool.
pub fn load_project(global: &GlobalArgs) -> Result<(PathBuf, KilnConfig), Box<dyn std::error::Error>> {
    let root = resolve_project_root(global)?;
    let config = load_config(&root)?;
    init_tracing(global, &config.log.filter);
    configure_threads(config.scan.threads);
    debug!(root = %root.display(), project = %config.project.name, "loaded project");
    Ok((root, config))
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins; otherwise `--verbose` selects `debug`, `--quiet` selects
/// `error`, and the configured filter applies. A second call is a no-op.
pub fn init_tracing(global: &GlobalArgs, configured: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if global.verbose {
            "debug"
        } else if global.quiet {
            "error"
        } else {
            configured
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Sizes the rayon global pool used by the scanners.
fn configure_threads(threads: Option<usize>) {
    let Some(threads) = threads else {
        return;
    };
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        warn!("could not configure {threads} scan threads: {e}");
    }
}

/// Discovers C++ sources and plugin metadata under `dir` (recursive).
///
/// Returns `(path, tag)` pairs sorted by path. Hidden directories and
/// `skip` (the scan cache) are not descended into.
pub fn discover_sources(
    dir: &Path,
    skip: &Path,
) -> Result<Vec<(PathBuf, &'static str)>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    walk_dir(dir, skip, &mut files)?;
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

fn walk_dir(
    dir: &Path,
    skip: &Path,
    files: &mut Vec<(PathBuf, &'static str)>,
) -> Result<(), Box<dyn std::error::Error>> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if !hidden && path != skip {
                walk_dir(&path, skip, files)?;
            }
        } else if let Some(tag) = detect_tag(&path) {
            files.push((path, tag));
        }
    }
    Ok(())
}

/// Maps a file extension to the file tag the scanners understand.
///
/// Returns `None` for unrecognized extensions.
pub fn detect_tag(path: &Path) -> Option<&'static str> {
    match path.extension()?.to_str()? {
        "h" | "hh" | "hpp" | "hxx" => Some("hpp"),
        "cpp" | "cc" | "cxx" | "c++" | "cppm" | "ixx" => Some("cpp"),
        "c" => Some("c"),
        "mm" => Some("objcpp"),
        "json" => Some("qt_plugin_metadata"),
        _ => None,
    }
}

/// Builds a graph with one product named after the project, holding every
/// discovered source with its on-disk timestamp.
pub fn build_graph(
    root: &Path,
    config: &KilnConfig,
) -> Result<(BuildGraph, ProductId), Box<dyn std::error::Error>> {
    let cache_dir = root.join(&config.scan.cache_dir);
    let mut graph = BuildGraph::new();
    let product = graph.add_product(config.project.name.clone(), PropertyMap::new());
    for (path, tag) in discover_sources(root, &cache_dir)? {
        let timestamp = FileTime::of_file(&path)?;
        graph.add_source(product, path, &[tag], timestamp)?;
    }
    debug!(artifacts = graph.len(), "built artifact graph");
    Ok((graph, product))
}
