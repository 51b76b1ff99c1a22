//! Products: named groups of artifacts built under one property set.

use kiln_common::PropertyMap;

use crate::ids::ArtifactId;

/// A build product (application, library, plugin).
#[derive(Clone, Debug)]
pub struct Product {
    /// Display name used in command descriptions.
    pub name: String,
    /// Module properties every artifact of this product is compiled under.
    pub properties: PropertyMap,
    pub(crate) artifacts: Vec<ArtifactId>,
}

impl Product {
    /// Creates an empty product.
    pub fn new(name: impl Into<String>, properties: PropertyMap) -> Self {
        Self {
            name: name.into(),
            properties,
            artifacts: Vec::new(),
        }
    }

    /// Artifacts of this product in insertion order.
    pub fn artifacts(&self) -> &[ArtifactId] {
        &self.artifacts
    }
}
