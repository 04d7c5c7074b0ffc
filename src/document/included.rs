//! Deduplicated `included` accumulator

use indexmap::IndexMap;
use std::collections::HashSet;

use crate::document::wire::{ResourceIdentifier, ResourceObject};

/// Related resources collected across a whole document
///
/// Keyed by identity; the visited set also records identities that must
/// not be traversed again, including the document's primary resources.
#[derive(Debug, Clone, Default)]
pub struct IncludedSet {
    resources: IndexMap<ResourceIdentifier, ResourceObject>,
    visited: HashSet<ResourceIdentifier>,
}

impl IncludedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an identity as visited
    ///
    /// Returns `false` when it was already visited.
    pub fn visit(&mut self, resource_type: &str, id: &str) -> bool {
        self.visited.insert(ResourceIdentifier::new(resource_type, id))
    }

    pub fn is_visited(&self, resource_type: &str, id: &str) -> bool {
        self.visited
            .contains(&ResourceIdentifier::new(resource_type, id))
    }

    /// Add a rendered resource; an existing entry with the same identity is replaced
    pub fn insert(&mut self, resource: ResourceObject) {
        let key = resource.identifier();
        self.visited.insert(key.clone());
        self.resources.insert(key, resource);
    }

    pub fn contains(&self, resource_type: &str, id: &str) -> bool {
        self.resources
            .contains_key(&ResourceIdentifier::new(resource_type, id))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn into_vec(self) -> Vec<ResourceObject> {
        self.resources.into_values().collect()
    }
}
