//! Reference rules for meta-object companions.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use kiln_common::FileTag;
use kiln_config::AutomocConfig;
use kiln_graph::{ArtifactId, BuildGraph, ProductId};
use tracing::trace;

use crate::error::RuleError;
use crate::file_type::FileType;
use crate::rules::{ArtifactsPerFileTag, RulesApplicator};
use crate::tags::AutomocTags;

/// Creates companion artifacts for a batch in `output_dir`.
///
/// | tag | output | edges |
/// |---|---|---|
/// | `moc_hpp` | `<prefix><base>.<hext>` tagged `cpp`, plus `<prefix><base>.<oext>` tagged `obj` | companion consumes header, object consumes companion |
/// | `moc_hpp_inc` | `<prefix><base>.<hext>` tagged `hpp` | companion consumes header |
/// | `moc_cpp` | `<base>.<sext>` tagged `hpp` | companion consumes unit |
/// | `c++_pch` | nothing; remembered | none |
pub struct MocRules {
    config: AutomocConfig,
    output_dir: PathBuf,
    precompiled_header: Option<ArtifactId>,
    created: BTreeSet<ArtifactId>,
}

impl MocRules {
    /// Creates rules writing into `output_dir`.
    pub fn new(config: AutomocConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            output_dir: output_dir.into(),
            precompiled_header: None,
            created: BTreeSet::new(),
        }
    }

    /// The precompiled header of the last batch that had one.
    pub fn precompiled_header(&self) -> Option<ArtifactId> {
        self.precompiled_header
    }

    /// Artifacts created or reused by every batch so far.
    pub fn created(&self) -> &BTreeSet<ArtifactId> {
        &self.created
    }

    fn moc_header(
        &mut self,
        graph: &mut BuildGraph,
        product: ProductId,
        header: ArtifactId,
        origin: FileTag,
        compiled: bool,
    ) -> Result<(), RuleError> {
        let base = input_base_name(graph, header, origin)?;
        let companion_path = self
            .output_dir
            .join(FileType::Header.companion_name(&base, &self.config));
        let companion_tag = if compiled { "cpp" } else { "hpp" };
        let companion = self.ensure(graph, product, &companion_path, companion_tag, origin)?;
        graph.connect(companion, header)?;

        if compiled {
            let object_path = self.output_dir.join(format!(
                "{}{}.{}",
                self.config.header_prefix, base, self.config.object_extension
            ));
            let cpp = graph.tag("cpp");
            let object = self.ensure(graph, product, &object_path, "obj", cpp)?;
            graph.connect(object, companion)?;
        }
        Ok(())
    }

    fn moc_source(
        &mut self,
        graph: &mut BuildGraph,
        product: ProductId,
        unit: ArtifactId,
        origin: FileTag,
    ) -> Result<(), RuleError> {
        let base = input_base_name(graph, unit, origin)?;
        let path = self
            .output_dir
            .join(FileType::Source.companion_name(&base, &self.config));
        let companion = self.ensure(graph, product, &path, "hpp", origin)?;
        graph.connect(companion, unit)?;
        Ok(())
    }

    /// Returns the artifact at `path` retagged for this rule, creating it if
    /// absent.
    fn ensure(
        &mut self,
        graph: &mut BuildGraph,
        product: ProductId,
        path: &Path,
        tag: &str,
        origin: FileTag,
    ) -> Result<ArtifactId, RuleError> {
        let id = match graph.find(path) {
            Some(existing) => {
                let tags = graph.interner().tags([tag]);
                if let Some(artifact) = graph.get_mut(existing) {
                    artifact.file_tags = tags;
                    artifact.origin_tag = Some(origin);
                }
                trace!(path = %path.display(), "reusing generated artifact");
                existing
            }
            None => graph.add_generated(product, path, &[tag], origin)?,
        };
        self.created.insert(id);
        Ok(id)
    }
}

fn input_base_name(graph: &BuildGraph, id: ArtifactId, origin: FileTag) -> Result<String, RuleError> {
    match graph.get(id) {
        Some(artifact) => Ok(artifact.base_name().to_string()),
        None => Err(RuleError::Failed {
            tag: graph.interner().resolve(origin).to_string(),
            input: id.to_string(),
            reason: "input artifact no longer exists".to_string(),
        }),
    }
}

impl RulesApplicator for MocRules {
    fn apply_rules(
        &mut self,
        graph: &mut BuildGraph,
        product: ProductId,
        batch: &ArtifactsPerFileTag,
    ) -> Result<(), RuleError> {
        let tags = AutomocTags::new(graph.interner());
        for (&tag, inputs) in batch {
            for &input in inputs {
                if tag == tags.moc_hpp {
                    self.moc_header(graph, product, input, tag, true)?;
                } else if tag == tags.moc_hpp_inc {
                    self.moc_header(graph, product, input, tag, false)?;
                } else if tag == tags.moc_cpp {
                    self.moc_source(graph, product, input, tag)?;
                } else if tag == tags.pch {
                    self.precompiled_header = Some(input);
                } else {
                    trace!(tag = graph.interner().resolve(tag), "no moc rule for tag");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_common::{FileTime, PropertyMap};

    fn setup() -> (BuildGraph, ProductId, ArtifactId, AutomocTags) {
        let mut graph = BuildGraph::new();
        let product = graph.add_product("app", PropertyMap::new());
        let header = graph
            .add_source(product, "/src/widget.hpp", &["hpp", "moc_hpp"], FileTime::from_nanos(1))
            .unwrap();
        let tags = AutomocTags::new(graph.interner());
        (graph, product, header, tags)
    }

    fn batch(tag: FileTag, id: ArtifactId) -> ArtifactsPerFileTag {
        let mut batch = ArtifactsPerFileTag::new();
        batch.entry(tag).or_default().insert(id);
        batch
    }

    #[test]
    fn compiled_header_companion() {
        let (mut graph, product, header, tags) = setup();
        let mut rules = MocRules::new(AutomocConfig::default(), "/build");
        rules
            .apply_rules(&mut graph, product, &batch(tags.moc_hpp, header))
            .unwrap();

        let companion = graph.find(Path::new("/build/moc_widget.cpp")).unwrap();
        let object = graph.find(Path::new("/build/moc_widget.o")).unwrap();
        assert!(graph.get(header).unwrap().parents().contains(&companion));
        assert!(graph.get(companion).unwrap().parents().contains(&object));
        assert_eq!(graph.tag_names(companion), vec!["cpp"]);
        assert_eq!(graph.tag_names(object), vec!["obj"]);
        assert_eq!(graph.get(companion).unwrap().origin_tag, Some(tags.moc_hpp));
        assert_eq!(rules.created().len(), 2);
    }

    #[test]
    fn included_header_companion_has_no_object() {
        let (mut graph, product, header, tags) = setup();
        let mut rules = MocRules::new(AutomocConfig::default(), "/build");
        rules
            .apply_rules(&mut graph, product, &batch(tags.moc_hpp_inc, header))
            .unwrap();
        let companion = graph.find(Path::new("/build/moc_widget.cpp")).unwrap();
        assert_eq!(graph.tag_names(companion), vec!["hpp"]);
        assert!(graph.find(Path::new("/build/moc_widget.o")).is_none());
    }

    #[test]
    fn source_companion() {
        let mut graph = BuildGraph::new();
        let product = graph.add_product("app", PropertyMap::new());
        let unit = graph
            .add_source(product, "/src/main.cpp", &["cpp", "moc_cpp"], FileTime::from_nanos(1))
            .unwrap();
        let tags = AutomocTags::new(graph.interner());
        let mut rules = MocRules::new(AutomocConfig::default(), "/build");
        rules
            .apply_rules(&mut graph, product, &batch(tags.moc_cpp, unit))
            .unwrap();
        let companion = graph.find(Path::new("/build/main.moc")).unwrap();
        assert!(graph.get(unit).unwrap().parents().contains(&companion));
        assert_eq!(graph.get(companion).unwrap().origin_tag, Some(tags.moc_cpp));
    }

    #[test]
    fn existing_companion_is_reused_and_retagged() {
        let (mut graph, product, header, tags) = setup();
        let mut rules = MocRules::new(AutomocConfig::default(), "/build");
        rules
            .apply_rules(&mut graph, product, &batch(tags.moc_hpp_inc, header))
            .unwrap();
        let before = graph.len();
        rules
            .apply_rules(&mut graph, product, &batch(tags.moc_hpp, header))
            .unwrap();
        let companion = graph.find(Path::new("/build/moc_widget.cpp")).unwrap();
        assert_eq!(graph.tag_names(companion), vec!["cpp"]);
        assert_eq!(graph.len(), before + 1);
    }

    #[test]
    fn pch_is_recorded_only() {
        let (mut graph, product, _, tags) = setup();
        let pch = graph
            .add_source(product, "/src/pch.h", &["c++_pch"], FileTime::from_nanos(1))
            .unwrap();
        let before = graph.len();
        let mut rules = MocRules::new(AutomocConfig::default(), "/build");
        rules.apply_rules(&mut graph, product, &batch(tags.pch, pch)).unwrap();
        assert_eq!(rules.precompiled_header(), Some(pch));
        assert_eq!(graph.len(), before);
    }

    #[test]
    fn custom_naming() {
        let (mut graph, product, header, tags) = setup();
        let config = AutomocConfig {
            header_prefix: "qt_".to_string(),
            header_extension: "cxx".to_string(),
            source_extension: "moc".to_string(),
            object_extension: "obj".to_string(),
        };
        let mut rules = MocRules::new(config, "/out");
        rules
            .apply_rules(&mut graph, product, &batch(tags.moc_hpp, header))
            .unwrap();
        assert!(graph.find(Path::new("/out/qt_widget.cxx")).is_some());
        assert!(graph.find(Path::new("/out/qt_widget.obj")).is_some());
    }
}
