//! The rule-application seam.

use std::collections::{BTreeMap, BTreeSet};

use kiln_common::FileTag;
use kiln_graph::{ArtifactId, BuildGraph, ProductId};

use crate::error::RuleError;

/// Artifacts needing companions, grouped by the tag that selects the rule.
pub type ArtifactsPerFileTag = BTreeMap<FileTag, BTreeSet<ArtifactId>>;

/// Instantiates rules for a batch of tagged artifacts.
///
/// Called at most once per pass, from the pass's single mutation section.
/// Implementations add generated artifacts and edges to `graph`.
pub trait RulesApplicator {
    /// Applies every rule matching a tag in `batch` to its artifacts.
    fn apply_rules(
        &mut self,
        graph: &mut BuildGraph,
        product: ProductId,
        batch: &ArtifactsPerFileTag,
    ) -> Result<(), RuleError>;
}
