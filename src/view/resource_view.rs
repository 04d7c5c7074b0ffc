//! Rendering of a single entity through its view descriptor

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::core::error::{EngineError, EngineResult};
use crate::core::permission::{AccessMode, Tier, grant_name};
use crate::core::query::QueryContext;
use crate::core::resource::{Related, Resource};
use crate::document::included::IncludedSet;
use crate::document::wire::{
    RelationshipLinks, RelationshipObject, ResourceIdentifier, ResourceLinkage, ResourceObject,
};
use crate::view::descriptor::{RelationshipDescriptor, ViewDescriptor};
use crate::view::registry::ViewRegistry;

/// Shared, read-only inputs of one render
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub registry: &'a ViewRegistry,
    pub query: &'a QueryContext,
    /// Reported as `jsonapi.meta.apiVersion`
    pub api_version: &'a str,
}

impl<'a> RenderContext<'a> {
    pub fn new(registry: &'a ViewRegistry, query: &'a QueryContext) -> Self {
        Self {
            registry,
            query,
            api_version: env!("CARGO_PKG_VERSION"),
        }
    }

    pub fn with_api_version(mut self, api_version: &'a str) -> Self {
        self.api_version = api_version;
        self
    }
}

/// One entity bound to its descriptor and the request
///
/// The caller's read and write tiers are resolved once at construction.
pub struct ResourceView<'a> {
    entity: &'a dyn Resource,
    descriptor: &'a ViewDescriptor,
    ctx: RenderContext<'a>,
    read_tier: Tier,
    write_tier: Tier,
}

impl<'a> ResourceView<'a> {
    pub fn new(ctx: RenderContext<'a>, descriptor: &'a ViewDescriptor, entity: &'a dyn Resource) -> Self {
        let is_self = descriptor.is_self(entity, ctx.query.caller());
        let namespace = descriptor.permission_namespace();
        Self {
            entity,
            descriptor,
            ctx,
            read_tier: ctx.query.effective_tier(namespace, AccessMode::Read, is_self),
            write_tier: ctx.query.effective_tier(namespace, AccessMode::Write, is_self),
        }
    }

    /// Look up the descriptor for `resource_type` and bind the entity
    pub fn of_type(ctx: RenderContext<'a>, resource_type: &str, entity: &'a dyn Resource) -> EngineResult<Self> {
        let descriptor = ctx.registry.require(resource_type)?;
        Ok(Self::new(ctx, descriptor, entity))
    }

    pub fn id(&self) -> String {
        self.entity.id()
    }

    pub fn resource_type(&self) -> &str {
        self.descriptor.resource_type()
    }

    pub fn descriptor(&self) -> &ViewDescriptor {
        self.descriptor
    }

    pub fn entity(&self) -> &'a dyn Resource {
        self.entity
    }

    pub fn query(&self) -> &'a QueryContext {
        self.ctx.query
    }

    pub fn read_tier(&self) -> Tier {
        self.read_tier
    }

    pub fn write_tier(&self) -> Tier {
        self.write_tier
    }

    /// Attributes the caller may read, in declaration order
    ///
    /// Hidden attributes are omitted, readable but unset ones render as `null`.
    pub fn attributes(&self) -> Map<String, Value> {
        self.descriptor
            .attributes()
            .filter(|(name, _)| {
                self.descriptor
                    .read_tier(name)
                    .is_some_and(|tier| tier.satisfied_by(self.read_tier))
            })
            .map(|(name, _)| {
                (
                    name.to_string(),
                    self.entity.attribute(name).unwrap_or(Value::Null),
                )
            })
            .collect()
    }

    /// `<base>/<type>/<id>`
    pub fn self_link(&self) -> String {
        self.ctx.query.resource_url(self.resource_type(), &self.id())
    }

    fn links_for(&self, self_link: &str, name: &str) -> RelationshipLinks {
        RelationshipLinks {
            self_link: format!("{}/relationships/{}", self_link, name),
            related: format!("{}/{}", self_link, name),
        }
    }

    /// Links of every declared relationship; nothing is resolved
    pub fn relationship_links(&self) -> IndexMap<String, RelationshipLinks> {
        let self_link = self.self_link();
        self.descriptor
            .relationships()
            .map(|rel| (rel.name.clone(), self.links_for(&self_link, &rel.name)))
            .collect()
    }

    fn can_read(&self, relationship: &RelationshipDescriptor) -> bool {
        relationship.read.satisfied_by(self.read_tier)
    }

    /// Linkage of a loaded, readable relationship
    pub fn linkage(&self, name: &str) -> Option<ResourceLinkage> {
        let relationship = self.descriptor.relationship_named(name)?;
        if !self.can_read(relationship) {
            return None;
        }
        let identify = |entity: &dyn Resource| {
            ResourceIdentifier::new(&relationship.related_type, entity.id())
        };
        match self.entity.related(name) {
            Related::NotLoaded => None,
            Related::One(entity) => Some(ResourceLinkage::One(entity.map(identify))),
            Related::Many(entities) => Some(ResourceLinkage::Many(
                entities.into_iter().map(identify).collect(),
            )),
        }
    }

    pub fn relationships(&self) -> IndexMap<String, RelationshipObject> {
        let self_link = self.self_link();
        self.descriptor
            .relationships()
            .map(|rel| {
                let object = RelationshipObject {
                    links: self.links_for(&self_link, &rel.name),
                    data: self.linkage(&rel.name),
                };
                (rel.name.clone(), object)
            })
            .collect()
    }

    pub fn render(&self) -> ResourceObject {
        ResourceObject {
            resource_type: self.resource_type().to_string(),
            id: self.id(),
            attributes: self.attributes(),
            relationships: self.relationships(),
        }
    }

    /// Render every loaded, readable related entity into `included`
    ///
    /// Identities already in the visited set are neither rendered nor
    /// traversed again, so cyclic graphs terminate.
    pub fn generate_includes<'s>(&self, included: &'s mut IncludedSet) -> &'s mut IncludedSet {
        let entity: &'a dyn Resource = self.entity;
        for relationship in self.descriptor.relationships() {
            if !self.can_read(relationship) {
                continue;
            }
            let Some(descriptor) = self.ctx.registry.get(&relationship.related_type) else {
                tracing::warn!(
                    resource_type = %self.resource_type(),
                    relationship = %relationship.name,
                    related_type = %relationship.related_type,
                    "no descriptor for related type, skipping includes"
                );
                continue;
            };

            for related in entity.related(&relationship.name).entities() {
                let id = related.id();
                if !included.visit(&relationship.related_type, &id) {
                    tracing::debug!(
                        resource_type = %relationship.related_type,
                        id = %id,
                        "already visited, not traversing again"
                    );
                    continue;
                }
                let view = ResourceView::new(self.ctx, descriptor, related);
                included.insert(view.render());
                view.generate_includes(included);
            }
        }
        included
    }

    fn denied(&self, tier: Tier, mode: AccessMode, pointer: Option<String>) -> EngineError {
        let permission = grant_name(tier, self.descriptor.permission_namespace(), mode)
            .unwrap_or_else(|| tier.to_string());
        tracing::warn!(
            resource_type = %self.resource_type(),
            id = %self.id(),
            permission = %permission,
            "permission denied"
        );
        EngineError::PermissionDenied { permission, pointer }
    }

    /// Require the caller to read this entity at `self` tier or above
    pub fn require_read(&self) -> EngineResult<()> {
        if Tier::Owner.satisfied_by(self.read_tier) {
            Ok(())
        } else {
            Err(self.denied(Tier::Group, AccessMode::Read, None))
        }
    }

    /// Require the caller to be allowed to write every named attribute
    ///
    /// Attributes that are not declared writable always fail.
    pub fn require_write<S: AsRef<str>>(&self, fields: &[S]) -> EngineResult<()> {
        for field in fields {
            let field = field.as_ref();
            let pointer = Some(format!("/data/attributes/{}", field));
            match self.descriptor.write_tier(field) {
                Some(tier) if tier.satisfied_by(self.write_tier) => {}
                Some(tier) => return Err(self.denied(tier, AccessMode::Write, pointer)),
                None => return Err(self.denied(Tier::Sudo, AccessMode::Write, pointer)),
            }
        }
        Ok(())
    }

    fn relationship_descriptor(&self, name: &str) -> EngineResult<&'a RelationshipDescriptor> {
        let descriptor: &'a ViewDescriptor = self.descriptor;
        descriptor
            .relationship_named(name)
            .ok_or_else(|| EngineError::UnsupportedRelationship {
                resource_type: self.resource_type().to_string(),
                relationship: name.to_string(),
            })
    }

    /// Require the read tier of a relationship
    pub fn require_relationship_read(&self, name: &str) -> EngineResult<&'a RelationshipDescriptor> {
        let relationship = self.relationship_descriptor(name)?;
        if self.can_read(relationship) {
            Ok(relationship)
        } else {
            Err(self.denied(
                relationship.read,
                AccessMode::Read,
                Some(format!("/data/relationships/{}", name)),
            ))
        }
    }

    /// Require the write tier of a relationship
    pub fn require_relationship_write(&self, name: &str) -> EngineResult<&'a RelationshipDescriptor> {
        let relationship = self.relationship_descriptor(name)?;
        if relationship.write.satisfied_by(self.write_tier) {
            Ok(relationship)
        } else {
            Err(self.denied(
                relationship.write,
                AccessMode::Write,
                Some(format!("/data/relationships/{}", name)),
            ))
        }
    }
}
