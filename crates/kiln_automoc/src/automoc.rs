//! The automoc pass.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use kiln_cache::ScanResultCache;
use kiln_common::{FileTag, FileTime};
use kiln_config::AutomocConfig;
use kiln_graph::{ArtifactId, ArtifactKind, BuildGraph, ProductId};
use kiln_scan::{ScannerRegistry, TagScanOutput, TagScanner};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::error::AutomocError;
use crate::file_type::FileType;
use crate::observer::{PassObserver, TracingObserver};
use crate::rules::{ArtifactsPerFileTag, RulesApplicator};
use crate::tags::AutomocTags;

const SCANNER_TAG: &str = "hpp";
const SCANNER_ARTIFACT_TYPE: &str = "C++ header";

/// What one pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Source artifacts that were scanned, in product order.
    pub scanned: Vec<ArtifactId>,
    /// The batch handed to the rules applicator. Empty if it was not called.
    pub batch: ArtifactsPerFileTag,
    /// Paths of artifacts removed by retraction.
    pub retracted: Vec<PathBuf>,
    /// The product's plugin header, if one was found this pass.
    pub plugin_header: Option<ArtifactId>,
}

struct Candidate {
    id: ArtifactId,
    path: PathBuf,
    tag_names: Vec<String>,
    timestamp: FileTime,
    file_type: FileType,
    marker: Option<FileTag>,
}

/// Adds and retracts meta-object companions as sources change.
///
/// The registry and cache are shared with the rest of the engine; the pass
/// itself keeps no state between calls beyond what it writes to artifacts.
pub struct AutoMoc {
    registry: Arc<ScannerRegistry>,
    cache: Arc<ScanResultCache>,
    config: AutomocConfig,
    observer: Arc<dyn PassObserver>,
}

impl AutoMoc {
    /// Creates a pass reporting command descriptions through `tracing`.
    pub fn new(registry: Arc<ScannerRegistry>, cache: Arc<ScanResultCache>, config: AutomocConfig) -> Self {
        Self {
            registry,
            cache,
            config,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replaces the observer.
    pub fn with_observer(mut self, observer: Arc<dyn PassObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Runs one pass over `product` using the current time.
    pub fn apply(
        &self,
        graph: &mut BuildGraph,
        product: ProductId,
        rules: &mut dyn RulesApplicator,
    ) -> Result<PassReport, AutomocError> {
        self.apply_at(graph, product, rules, FileTime::current_time())
    }

    /// Runs one pass over `product`, stamping processed artifacts with `now`.
    ///
    /// Scanning runs in parallel against a read-only graph. All mutations
    /// happen afterwards in one serial section. Fails before touching the
    /// graph if no scanner is registered for headers.
    pub fn apply_at(
        &self,
        graph: &mut BuildGraph,
        product: ProductId,
        rules: &mut dyn RulesApplicator,
        now: FileTime,
    ) -> Result<PassReport, AutomocError> {
        let product_name = graph
            .product(product)
            .map(|p| p.name.clone())
            .ok_or(AutomocError::UnknownProduct(product))?;
        let scanner = TagScanner::new(
            &self.registry,
            SCANNER_TAG,
            SCANNER_ARTIFACT_TYPE,
            Arc::clone(&self.cache),
        )?;
        let tags = AutomocTags::new(graph.interner());
        let mut report = PassReport::default();

        let mut pch = None;
        let mut plugin_metadata = None;
        let mut candidates = Vec::new();
        for id in graph.product_artifacts(product) {
            let Some(artifact) = graph.get(id) else {
                continue;
            };
            if pch.is_none() && artifact.has_tag(tags.pch) {
                pch = Some(id);
            }
            if plugin_metadata.is_none() && artifact.has_tag(tags.plugin_metadata) {
                debug!(path = %artifact.path.display(), "found plugin metadata file");
                plugin_metadata = Some(id);
            }
            if artifact.kind != ArtifactKind::SourceFile {
                continue;
            }
            if artifact
                .automoc_timestamp
                .is_some_and(|last| artifact.timestamp < last)
            {
                continue;
            }
            let file_type = FileType::classify(&artifact.file_tags, &tags);
            if let Some(artifact) = graph.get_mut(id) {
                artifact.automoc_timestamp = Some(now);
            }
            let Some(file_type) = file_type else {
                continue;
            };
            let Some(artifact) = graph.get(id) else {
                continue;
            };
            candidates.push(Candidate {
                id,
                path: artifact.path.clone(),
                tag_names: graph.interner().names(&artifact.file_tags),
                timestamp: artifact.timestamp,
                file_type,
                marker: file_type.companion_marker(&artifact.file_tags, &tags),
            });
        }

        let outputs: Vec<TagScanOutput> = candidates
            .par_iter()
            .map(|c| {
                let tag_refs: Vec<&str> = c.tag_names.iter().map(String::as_str).collect();
                scanner.scan(&c.path, &tag_refs, c.timestamp, now)
            })
            .collect();

        let included = self.included_companions(&outputs);
        let mut to_moc = Vec::new();
        for (candidate, output) in candidates.iter().zip(&outputs) {
            report.scanned.push(candidate.id);
            let has_macro = output.tags.iter().any(|t| t.starts_with("moc"));
            if has_macro {
                trace!(path = %candidate.path.display(), "finds meta-object macro");
            }
            let discovered: Vec<FileTag> = output
                .tags
                .iter()
                .map(|t| graph.interner().intern(t))
                .collect();
            if let Some(artifact) = graph.get_mut(candidate.id) {
                for tag in discovered {
                    // An existing companion keeps its marker; a different
                    // marker would request a second companion.
                    if candidate.marker.is_some_and(|m| m != tag) && tags.is_companion_marker(tag) {
                        continue;
                    }
                    artifact.file_tags.insert(tag);
                }
            }

            match (has_macro, candidate.marker) {
                (true, None) => to_moc.push((candidate.id, candidate.file_type)),
                (false, Some(marker)) => self.unmoc(graph, candidate.id, marker, &tags, &mut report),
                _ => {}
            }
        }

        let mut batch = ArtifactsPerFileTag::new();
        for &(id, file_type) in to_moc.iter().rev() {
            let Some(artifact) = graph.get_mut(id) else {
                continue;
            };
            match file_type {
                FileType::Header if artifact.has_tag(tags.moc_hpp) => {
                    let name = file_type.companion_name(artifact.base_name(), &self.config);
                    if included.contains(&name) {
                        trace!(path = %artifact.path.display(), companion = %name, "companion is included, generating for inclusion");
                        artifact.file_tags.remove(&tags.moc_hpp);
                        artifact.file_tags.insert(tags.moc_hpp_inc);
                        batch.entry(tags.moc_hpp_inc).or_default().insert(id);
                    } else {
                        batch.entry(tags.moc_hpp).or_default().insert(id);
                    }
                }
                FileType::Header if artifact.has_tag(tags.moc_plugin_hpp) => {
                    debug!(path = %artifact.path.display(), "found plugin header file");
                    artifact.file_tags.remove(&tags.moc_plugin_hpp);
                    artifact.file_tags.insert(tags.moc_hpp);
                    batch.entry(tags.moc_hpp).or_default().insert(id);
                    if report.plugin_header.is_none() {
                        report.plugin_header = Some(id);
                    }
                }
                FileType::Source if artifact.has_tag(tags.moc_cpp) => {
                    batch.entry(tags.moc_cpp).or_default().insert(id);
                }
                _ => {}
            }
        }

        if !batch.is_empty() {
            if let Some(pch) = pch {
                batch.entry(tags.pch).or_default().insert(pch);
            }
            debug!(
                product = %product_name,
                tags = batch.len(),
                artifacts = batch.values().map(BTreeSet::len).sum::<usize>(),
                "applying moc rules"
            );
            self.observer.command_description(
                "automoc",
                &format!("Applying moc rules for '{product_name}'."),
            );
            rules
                .apply_rules(graph, product, &batch)
                .map_err(|source| AutomocError::Rules {
                    product: product_name.clone(),
                    source,
                })?;
        }

        if let (Some(header), Some(metadata)) = (report.plugin_header, plugin_metadata) {
            let consumers: Vec<ArtifactId> = graph
                .get(header)
                .map(|h| h.parents().iter().copied().collect())
                .unwrap_or_default();
            for consumer in consumers {
                if consumer != metadata {
                    graph.connect(consumer, metadata)?;
                }
            }
        }

        report.batch = batch;
        debug!(
            product = %product_name,
            scanned = report.scanned.len(),
            retracted = report.retracted.len(),
            "automoc pass finished"
        );
        Ok(report)
    }

    /// Companion file names some scanned file includes verbatim.
    fn included_companions(&self, outputs: &[TagScanOutput]) -> BTreeSet<String> {
        let suffix = format!(".{}", self.config.header_extension);
        let mut included = BTreeSet::new();
        for dep in outputs.iter().flat_map(|o| &o.deps) {
            if dep.file_path.starts_with(&self.config.header_prefix) && dep.file_path.ends_with(&suffix) {
                trace!(file = %dep.file_path, "finds included companion");
                included.insert(dep.file_path.clone());
            }
        }
        included
    }

    /// Removes the companion of `id` and, for compiled header companions, the
    /// object built from it. Missing artifacts are skipped.
    fn unmoc(
        &self,
        graph: &mut BuildGraph,
        id: ArtifactId,
        marker: FileTag,
        tags: &AutomocTags,
        report: &mut PassReport,
    ) {
        let Some(artifact) = graph.get_mut(id) else {
            return;
        };
        trace!(path = %artifact.path.display(), "unmoc'ing");
        artifact.file_tags.remove(&marker);

        let Some(companion) = find_companion(graph, id, tags) else {
            trace!("generated companion could not be found");
            return;
        };

        if marker == tags.moc_hpp {
            match find_object(graph, companion, tags).and_then(|o| graph.remove_artifact(o)) {
                Some(removed) => {
                    trace!(path = %removed.path.display(), "removed companion object");
                    report.retracted.push(removed.path);
                }
                None => trace!("generated companion object could not be found"),
            }
        }

        if let Some(removed) = graph.remove_artifact(companion) {
            trace!(path = %removed.path.display(), "removed generated companion");
            report.retracted.push(removed.path);
        }
    }
}

/// The consumer of `id` that is its generated companion: a generated parent
/// tagged `hpp` or `cpp`, preferring one whose origin tag is a companion
/// marker. Source files never qualify.
fn find_companion(graph: &BuildGraph, id: ArtifactId, tags: &AutomocTags) -> Option<ArtifactId> {
    let parents: Vec<ArtifactId> = graph
        .get(id)?
        .parents()
        .iter()
        .copied()
        .filter(|p| {
            graph
                .get(*p)
                .is_some_and(|a| a.kind == ArtifactKind::Generated && a.has_any_tag(&[tags.hpp, tags.cpp]))
        })
        .collect();
    parents
        .iter()
        .copied()
        .find(|p| {
            graph
                .get(*p)
                .and_then(|a| a.origin_tag)
                .is_some_and(|t| tags.is_companion_marker(t))
        })
        .or_else(|| parents.first().copied())
}

/// The object compiled from `companion`: a generated parent tagged `obj` or
/// `fpicobj`.
fn find_object(graph: &BuildGraph, companion: ArtifactId, tags: &AutomocTags) -> Option<ArtifactId> {
    graph.get(companion)?.parents().iter().copied().find(|p| {
        graph
            .get(*p)
            .is_some_and(|o| o.kind == ArtifactKind::Generated && o.has_any_tag(&[tags.obj, tags.fpicobj]))
    })
}
