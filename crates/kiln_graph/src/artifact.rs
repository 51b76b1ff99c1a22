//! Artifact nodes: one file, its tags, its timestamps, and its edges.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use kiln_common::{FileTag, FileTags, FileTime};

use crate::ids::{ArtifactId, ProductId};

/// Where an artifact came from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ArtifactKind {
    /// A file discovered in the project sources.
    SourceFile,
    /// A file produced by a rule.
    Generated,
}

/// A node in the build graph representing one file.
#[derive(Clone, Debug)]
pub struct Artifact {
    /// Absolute path; the artifact's identity within the graph.
    pub path: PathBuf,
    /// Source or generated.
    pub kind: ArtifactKind,
    /// Classification labels that drive rule and scanner selection.
    pub file_tags: FileTags,
    /// Last-modified time of the backing file.
    pub timestamp: FileTime,
    /// When the automoc pass last processed this artifact; `None` if never.
    pub automoc_timestamp: Option<FileTime>,
    /// Owning product.
    pub product: ProductId,
    /// For generated artifacts, the tag of the input that caused the rule to fire.
    pub origin_tag: Option<FileTag>,
    pub(crate) parents: BTreeSet<ArtifactId>,
    pub(crate) children: BTreeSet<ArtifactId>,
}

impl Artifact {
    /// Creates an unconnected artifact.
    pub fn new(path: impl Into<PathBuf>, kind: ArtifactKind, product: ProductId) -> Self {
        Self {
            path: path.into(),
            kind,
            file_tags: FileTags::new(),
            timestamp: FileTime::OLDEST,
            automoc_timestamp: None,
            product,
            origin_tag: None,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
        }
    }

    /// Artifacts that consume this one as an input.
    pub fn parents(&self) -> &BTreeSet<ArtifactId> {
        &self.parents
    }

    /// Artifacts this one is built from or depends on.
    pub fn children(&self) -> &BTreeSet<ArtifactId> {
        &self.children
    }

    /// Returns `true` if the artifact carries `tag`.
    pub fn has_tag(&self, tag: FileTag) -> bool {
        self.file_tags.contains(&tag)
    }

    /// Returns `true` if the artifact carries any of `tags`.
    pub fn has_any_tag(&self, tags: &[FileTag]) -> bool {
        tags.iter().any(|t| self.file_tags.contains(t))
    }

    /// The final path component.
    pub fn file_name(&self) -> &str {
        file_name(&self.path)
    }

    /// The file name up to its first dot.
    pub fn base_name(&self) -> &str {
        base_name(&self.path)
    }
}

/// Returns the final component of `path`, or `""` if there is none.
pub fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// Returns the file name of `path` cut at its first dot.
///
/// `src/widget.hpp` and `src/widget.private.hpp` both yield `widget`.
pub fn base_name(path: &Path) -> &str {
    let name = file_name(path);
    match name.find('.') {
        Some(idx) => &name[..idx],
        None => name,
    }
}
