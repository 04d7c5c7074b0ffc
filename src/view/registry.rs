//! Registry of view descriptors keyed by resource type

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::core::error::{EngineError, EngineResult};
use crate::view::descriptor::ViewDescriptor;

/// All view descriptors known to the engine
///
/// Relationships name their related type; resolving the name here keeps
/// descriptors free of references to each other, so mutually related types
/// (rats and rescues) need no cyclic ownership.
#[derive(Debug, Clone, Default)]
pub struct ViewRegistry {
    descriptors: HashMap<String, Arc<ViewDescriptor>>,
}

impl ViewRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            descriptors: HashMap::new(),
        }
    }

    /// Build and validate a registry from configuration
    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        let mut registry = Self::new();
        for resource in &config.resources {
            registry.register(ViewDescriptor::from_config(resource)?)?;
        }
        registry.validate()?;

        tracing::debug!(
            resource_types = registry.descriptors.len(),
            "view registry loaded"
        );
        Ok(registry)
    }

    /// Register a descriptor under its type name
    pub fn register(&mut self, descriptor: ViewDescriptor) -> EngineResult<()> {
        let resource_type = descriptor.resource_type().to_string();
        if self.descriptors.contains_key(&resource_type) {
            return Err(EngineError::Config(format!(
                "resource type '{}' registered twice",
                resource_type
            )));
        }
        self.descriptors.insert(resource_type, Arc::new(descriptor));
        Ok(())
    }

    /// Check that every relationship points at a registered type
    pub fn validate(&self) -> EngineResult<()> {
        for descriptor in self.descriptors.values() {
            for relationship in descriptor.relationships() {
                if !self.descriptors.contains_key(&relationship.related_type) {
                    return Err(EngineError::Config(format!(
                        "relationship '{}' of {} targets unknown type '{}'",
                        relationship.name,
                        descriptor.resource_type(),
                        relationship.related_type
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, resource_type: &str) -> Option<&Arc<ViewDescriptor>> {
        self.descriptors.get(resource_type)
    }

    /// Get a descriptor or fail with `NotFound`
    pub fn require(&self, resource_type: &str) -> EngineResult<&Arc<ViewDescriptor>> {
        self.get(resource_type).ok_or_else(|| EngineError::NotFound {
            resource_type: resource_type.to_string(),
            parameter: "type".to_string(),
        })
    }

    /// Get all registered resource types
    pub fn resource_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.descriptors.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
