//! Per-resource-type view descriptors

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use crate::config::ResourceConfig;
use crate::core::error::{EngineError, EngineResult};
use crate::core::permission::{Caller, PermissionSet, Tier};
use crate::core::resource::Resource;
use crate::view::self_rule::{SelfCheck, SelfRule};

/// Read and write tiers of one attribute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributeRule {
    /// `None` falls back to the descriptor's default read tier
    pub read: Option<Tier>,
    /// `None` means never writable
    pub write: Option<Tier>,
}

/// A declared relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDescriptor {
    pub name: String,
    /// Type name of the related descriptor, resolved through the registry
    pub related_type: String,
    pub many: bool,
    pub read: Tier,
    pub write: Tier,
}

impl RelationshipDescriptor {
    pub fn new(name: impl Into<String>, related_type: impl Into<String>, many: bool) -> Self {
        Self {
            name: name.into(),
            related_type: related_type.into(),
            many,
            read: Tier::All,
            write: Tier::Group,
        }
    }

    pub fn read(mut self, tier: Tier) -> Self {
        self.read = tier;
        self
    }

    pub fn write(mut self, tier: Tier) -> Self {
        self.write = tier;
        self
    }
}

/// Declarative metadata of one resource type
///
/// Built once at startup, either from a [`ResourceConfig`] or in code, and
/// shared read-only afterwards. Relationships refer to other descriptors by
/// type name only.
///
/// # Example
///
/// ```rust,ignore
/// let ships = ViewDescriptor::new("ships")
///     .attribute("name", None, Some(Tier::Group))
///     .attribute("deletedAt", Some(Tier::Internal), Some(Tier::Internal))
///     .relationship(RelationshipDescriptor::new("rat", "rats", false))
///     .self_rule(SelfRule::OwnedAttribute { attribute: "ratId".into() });
/// ```
#[derive(Clone)]
pub struct ViewDescriptor {
    resource_type: String,
    namespace: String,
    default_read: Tier,
    attributes: IndexMap<String, AttributeRule>,
    relationships: IndexMap<String, RelationshipDescriptor>,
    self_rule: SelfRule,
    self_check: Option<SelfCheck>,
}

impl fmt::Debug for ViewDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewDescriptor")
            .field("resource_type", &self.resource_type)
            .field("namespace", &self.namespace)
            .field("default_read", &self.default_read)
            .field("attributes", &self.attributes)
            .field("relationships", &self.relationships)
            .field("self_rule", &self.self_rule)
            .field("self_check", &self.self_check.is_some())
            .finish()
    }
}

impl ViewDescriptor {
    /// Create a descriptor whose namespace is its type name
    pub fn new(resource_type: impl Into<String>) -> Self {
        let resource_type = resource_type.into();
        Self {
            namespace: resource_type.clone(),
            resource_type,
            default_read: Tier::All,
            attributes: IndexMap::new(),
            relationships: IndexMap::new(),
            self_rule: SelfRule::None,
            self_check: None,
        }
    }

    /// Build from configuration, rejecting malformed declarations
    pub fn from_config(config: &ResourceConfig) -> EngineResult<Self> {
        let mut descriptor = Self::new(&config.resource_type)
            .default_read(config.default_read)
            .self_rule(config.self_rule.clone());
        if let Some(namespace) = &config.namespace {
            descriptor = descriptor.namespace(namespace);
        }

        if !PermissionSet::is_valid_grant(&descriptor.namespace) || descriptor.namespace.contains('*')
        {
            return Err(EngineError::Config(format!(
                "'{}' is not a valid permission namespace for {}",
                descriptor.namespace, config.resource_type
            )));
        }

        for attribute in &config.attributes {
            if descriptor.attributes.contains_key(&attribute.name) {
                return Err(EngineError::Config(format!(
                    "attribute '{}' declared twice on {}",
                    attribute.name, config.resource_type
                )));
            }
            descriptor = descriptor.attribute(&attribute.name, attribute.read, attribute.write);
        }

        for relationship in &config.relationships {
            if descriptor.relationships.contains_key(&relationship.name)
                || descriptor.attributes.contains_key(&relationship.name)
            {
                return Err(EngineError::Config(format!(
                    "field '{}' declared twice on {}",
                    relationship.name, config.resource_type
                )));
            }
            descriptor = descriptor.relationship(
                RelationshipDescriptor::new(
                    &relationship.name,
                    &relationship.related_type,
                    relationship.many,
                )
                .read(relationship.read)
                .write(relationship.write),
            );
        }

        Ok(descriptor)
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn default_read(mut self, tier: Tier) -> Self {
        self.default_read = tier;
        self
    }

    /// Declare an attribute; declaration order is rendering order
    pub fn attribute(mut self, name: impl Into<String>, read: Option<Tier>, write: Option<Tier>) -> Self {
        self.attributes.insert(name.into(), AttributeRule { read, write });
        self
    }

    pub fn relationship(mut self, relationship: RelationshipDescriptor) -> Self {
        self.relationships
            .insert(relationship.name.clone(), relationship);
        self
    }

    pub fn self_rule(mut self, rule: SelfRule) -> Self {
        self.self_rule = rule;
        self
    }

    /// Register a self predicate in code; it is OR-ed with the self rule
    pub fn self_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&dyn Resource, &Caller) -> bool + Send + Sync + 'static,
    {
        self.self_check = Some(Arc::new(check));
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Permission namespace of this type
    pub fn permission_namespace(&self) -> &str {
        &self.namespace
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeRule)> {
        self.attributes.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Required read tier, `None` for undeclared attributes
    pub fn read_tier(&self, name: &str) -> Option<Tier> {
        self.attributes
            .get(name)
            .map(|rule| rule.read.unwrap_or(self.default_read))
    }

    /// Required write tier, `None` when the attribute is not writable
    pub fn write_tier(&self, name: &str) -> Option<Tier> {
        self.attributes.get(name).and_then(|rule| rule.write)
    }

    pub fn relationships(&self) -> impl Iterator<Item = &RelationshipDescriptor> {
        self.relationships.values()
    }

    pub fn relationship_named(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.get(name)
    }

    /// Whether the caller is the entity's own subject
    pub fn is_self(&self, entity: &dyn Resource, caller: Option<&Caller>) -> bool {
        let Some(caller) = caller else {
            return false;
        };
        self.self_rule.evaluate(entity, caller)
            || self.self_check.as_ref().is_some_and(|check| check(entity, caller))
    }
}
