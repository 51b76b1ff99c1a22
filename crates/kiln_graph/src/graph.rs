//! The build graph and its mutation primitives.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiln_common::{FileTag, FileTime, InternalError, KilnResult, PropertyMap, TagInterner};
use tracing::trace;

use crate::arena::Arena;
use crate::artifact::{Artifact, ArtifactKind};
use crate::ids::{ArtifactId, ProductId};
use crate::product::Product;

/// Owner of every artifact and product in a project.
///
/// Edges are stored on both endpoints as id sets. All structural changes go
/// through [`connect`](Self::connect), [`disconnect`](Self::disconnect), and
/// [`remove_artifact`](Self::remove_artifact), which keep both sides and the
/// path index consistent.
pub struct BuildGraph {
    interner: Arc<TagInterner>,
    artifacts: Arena<ArtifactId, Artifact>,
    products: Arena<ProductId, Product>,
    by_path: HashMap<PathBuf, ArtifactId>,
}

impl BuildGraph {
    /// Creates an empty graph with its own tag interner.
    pub fn new() -> Self {
        Self::with_interner(Arc::new(TagInterner::new()))
    }

    /// Creates an empty graph sharing an existing tag interner.
    pub fn with_interner(interner: Arc<TagInterner>) -> Self {
        Self {
            interner,
            artifacts: Arena::new(),
            products: Arena::new(),
            by_path: HashMap::new(),
        }
    }

    /// The interner all tags in this graph come from.
    pub fn interner(&self) -> &Arc<TagInterner> {
        &self.interner
    }

    /// Interns a tag name.
    pub fn tag(&self, name: &str) -> FileTag {
        self.interner.intern(name)
    }

    /// Adds a product.
    pub fn add_product(&mut self, name: impl Into<String>, properties: PropertyMap) -> ProductId {
        self.products.alloc(Product::new(name, properties))
    }

    /// Returns a product.
    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(id)
    }

    /// Iterates all products.
    pub fn products(&self) -> impl Iterator<Item = (ProductId, &Product)> {
        self.products.iter()
    }

    /// Registers a source file, or returns the artifact already at `path`.
    pub fn add_source(
        &mut self,
        product: ProductId,
        path: impl Into<PathBuf>,
        tags: &[&str],
        timestamp: FileTime,
    ) -> KilnResult<ArtifactId> {
        let path = path.into();
        if let Some(existing) = self.find(&path) {
            return Ok(existing);
        }
        let mut artifact = Artifact::new(path, ArtifactKind::SourceFile, product);
        artifact.file_tags = self.interner.tags(tags.iter().copied());
        artifact.timestamp = timestamp;
        self.insert_artifact(artifact)
    }

    /// Registers a generated artifact produced because of `origin_tag`.
    pub fn add_generated(
        &mut self,
        product: ProductId,
        path: impl Into<PathBuf>,
        tags: &[&str],
        origin_tag: FileTag,
    ) -> KilnResult<ArtifactId> {
        let mut artifact = Artifact::new(path, ArtifactKind::Generated, product);
        artifact.file_tags = self.interner.tags(tags.iter().copied());
        artifact.origin_tag = Some(origin_tag);
        self.insert_artifact(artifact)
    }

    /// Inserts a prepared artifact into the graph and its product.
    ///
    /// Edges on the incoming artifact are discarded; use
    /// [`connect`](Self::connect) afterwards. Fails if the product is unknown
    /// or another artifact already owns the path.
    pub fn insert_artifact(&mut self, mut artifact: Artifact) -> KilnResult<ArtifactId> {
        if !self.products.contains(artifact.product) {
            return Err(InternalError::new(format!(
                "product {} does not exist",
                artifact.product
            )));
        }
        if self.by_path.contains_key(&artifact.path) {
            return Err(InternalError::new(format!(
                "artifact {} already exists",
                artifact.path.display()
            )));
        }
        artifact.parents.clear();
        artifact.children.clear();
        let path = artifact.path.clone();
        let product = artifact.product;
        let id = self.artifacts.alloc(artifact);
        self.by_path.insert(path, id);
        self.products[product].artifacts.push(id);
        Ok(id)
    }

    /// Returns a live artifact.
    pub fn get(&self, id: ArtifactId) -> Option<&Artifact> {
        self.artifacts.get(id)
    }

    /// Returns a live artifact mutably.
    ///
    /// Edges are not reachable through this reference.
    pub fn get_mut(&mut self, id: ArtifactId) -> Option<&mut Artifact> {
        self.artifacts.get_mut(id)
    }

    /// Returns `true` if `id` refers to a live artifact.
    pub fn contains(&self, id: ArtifactId) -> bool {
        self.artifacts.contains(id)
    }

    /// Looks up the artifact at `path`.
    pub fn find(&self, path: &Path) -> Option<ArtifactId> {
        self.by_path.get(path).copied()
    }

    /// Number of live artifacts.
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Returns `true` if the graph holds no artifacts.
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Iterates all live artifacts.
    pub fn artifacts(&self) -> impl Iterator<Item = (ArtifactId, &Artifact)> {
        self.artifacts.iter()
    }

    /// Snapshot of a product's artifact ids, safe to hold across mutations.
    pub fn product_artifacts(&self, product: ProductId) -> Vec<ArtifactId> {
        self.products
            .get(product)
            .map(|p| p.artifacts.clone())
            .unwrap_or_default()
    }

    /// Makes `parent` depend on `child`. Returns `false` if the edge existed.
    pub fn connect(&mut self, parent: ArtifactId, child: ArtifactId) -> KilnResult<bool> {
        if parent == child {
            return Err(InternalError::new(format!("cannot connect {parent} to itself")));
        }
        if !self.contains(parent) || !self.contains(child) {
            return Err(InternalError::new(format!(
                "cannot connect {parent} -> {child}: dead artifact id"
            )));
        }
        let inserted = self.artifacts[parent].children.insert(child);
        self.artifacts[child].parents.insert(parent);
        if inserted {
            trace!(
                parent = %self.artifacts[parent].path.display(),
                child = %self.artifacts[child].path.display(),
                "connect"
            );
        }
        Ok(inserted)
    }

    /// Removes the edge `parent -> child`. Returns `true` if it existed.
    pub fn disconnect(&mut self, parent: ArtifactId, child: ArtifactId) -> bool {
        let removed = self
            .artifacts
            .get_mut(parent)
            .is_some_and(|p| p.children.remove(&child));
        if let Some(c) = self.artifacts.get_mut(child) {
            c.parents.remove(&parent);
        }
        removed
    }

    /// Detaches an artifact from all neighbours, its product, and the path
    /// index, then releases it. Returns `None` if `id` was already dead.
    pub fn remove_artifact(&mut self, id: ArtifactId) -> Option<Artifact> {
        let artifact = self.artifacts.remove(id)?;
        for parent in &artifact.parents {
            if let Some(p) = self.artifacts.get_mut(*parent) {
                p.children.remove(&id);
            }
        }
        for child in &artifact.children {
            if let Some(c) = self.artifacts.get_mut(*child) {
                c.parents.remove(&id);
            }
        }
        if self.by_path.get(&artifact.path) == Some(&id) {
            self.by_path.remove(&artifact.path);
        }
        if let Some(product) = self.products.get_mut(artifact.product) {
            product.artifacts.retain(|a| *a != id);
        }
        trace!(path = %artifact.path.display(), "removed artifact");
        Some(artifact)
    }

    /// Resolves an artifact's tags to names, sorted.
    pub fn tag_names(&self, id: ArtifactId) -> Vec<String> {
        self.get(id)
            .map(|a| self.interner.names(&a.file_tags))
            .unwrap_or_default()
    }
}

impl Default for BuildGraph {
    fn default() -> Self {
        Self::new()
    }
}
