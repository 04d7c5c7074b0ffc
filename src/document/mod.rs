//! JSON:API document assembly
//!
//! A [`Document`] is chosen in one of four [`ViewType`]s at construction and
//! keeps it for its lifetime:
//!
//! | view           | data              | included | page meta | cursors |
//! |----------------|-------------------|----------|-----------|---------|
//! | `collection`   | resource objects  | yes      | yes       | yes     |
//! | `individual`   | resource object   | yes      | no        | no      |
//! | `meta`         | none              | no       | no        | no      |
//! | `relationship` | related resources | no       | no        | no      |
//!
//! Any errors attached to a document replace `data` and `included` with
//! `errors`, whatever the view. A relationship document built from bare
//! linkage ([`Document::relationship_linkage`]) renders identifiers only.
//!
//! # Example
//!
//! ```rust,ignore
//! let ctx = RenderContext::new(&registry, &query);
//! let document = Document::collection(ctx, "rescues", rescues, 250)?;
//! let body = document.to_wire_string()?;
//! ```

pub mod included;
pub mod wire;

pub use included::IncludedSet;
pub use wire::{
    JsonApiInfo, Links, PrimaryData, RelationshipLinks, RelationshipObject, ResourceIdentifier,
    ResourceLinkage, ResourceObject, WireDocument,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::error::{EngineError, EngineResult, ErrorObject};
use crate::core::pagination::{PageCursor, PageMeta, Pagination, Unpaginated, cursor_link};
use crate::core::resource::Resource;
use crate::view::{RelationshipDescriptor, RenderContext, ResourceView, ViewDescriptor};

/// Rendering mode of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    Collection,
    Individual,
    Meta,
    Relationship,
}

impl ViewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewType::Collection => "collection",
            ViewType::Individual => "individual",
            ViewType::Meta => "meta",
            ViewType::Relationship => "relationship",
        }
    }
}

enum Body<'a> {
    Resources(Vec<&'a dyn Resource>),
    Related {
        descriptor: &'a ViewDescriptor,
        entities: Vec<&'a dyn Resource>,
        many: bool,
    },
    Linkage(ResourceLinkage),
}

enum Pages {
    Cursor(PageCursor),
    Unpaginated(Unpaginated),
}

/// A response document under construction
pub struct Document<'a> {
    ctx: RenderContext<'a>,
    descriptor: &'a ViewDescriptor,
    view: ViewType,
    body: Body<'a>,
    pages: Pages,
    self_link: String,
    meta: Map<String, Value>,
    errors: Vec<ErrorObject>,
}

impl<'a> Document<'a> {
    fn build(
        ctx: RenderContext<'a>,
        descriptor: &'a ViewDescriptor,
        view: ViewType,
        body: Body<'a>,
        pages: Pages,
        self_link: String,
    ) -> Self {
        Self {
            ctx,
            descriptor,
            view,
            body,
            pages,
            self_link,
            meta: Map::new(),
            errors: Vec::new(),
        }
    }

    /// One page of a collection
    ///
    /// `total` is the number of results across all pages; the requested page
    /// comes from the query context.
    pub fn collection(
        ctx: RenderContext<'a>,
        resource_type: &str,
        entities: Vec<&'a dyn Resource>,
        total: u64,
    ) -> EngineResult<Self> {
        let descriptor = ctx.registry.require(resource_type)?;
        let page = ctx.query.page();
        let cursor =
            PageCursor::new(total, page.size, page.number).with_count(entities.len() as u64);
        Ok(Self::build(
            ctx,
            descriptor,
            ViewType::Collection,
            Body::Resources(entities),
            Pages::Cursor(cursor),
            ctx.query.collection_url(resource_type),
        ))
    }

    /// A single resource; an absent entity yields a not-found error document
    pub fn individual(
        ctx: RenderContext<'a>,
        resource_type: &str,
        entity: Option<&'a dyn Resource>,
    ) -> EngineResult<Self> {
        Self::single(ctx, resource_type, entity, ViewType::Individual)
    }

    /// Meta and links only, never any resource data
    pub fn meta(
        ctx: RenderContext<'a>,
        resource_type: &str,
        entity: Option<&'a dyn Resource>,
    ) -> EngineResult<Self> {
        Self::single(ctx, resource_type, entity, ViewType::Meta)
    }

    fn single(
        ctx: RenderContext<'a>,
        resource_type: &str,
        entity: Option<&'a dyn Resource>,
        view: ViewType,
    ) -> EngineResult<Self> {
        let descriptor = ctx.registry.require(resource_type)?;
        let Some(entity) = entity else {
            let document = Self::build(
                ctx,
                descriptor,
                view,
                Body::Resources(Vec::new()),
                Pages::Unpaginated(Unpaginated::new(0)),
                ctx.query.collection_url(resource_type),
            );
            return Ok(document.with_errors([EngineError::not_found(resource_type)]));
        };
        Ok(Self::build(
            ctx,
            descriptor,
            view,
            Body::Resources(vec![entity]),
            Pages::Unpaginated(Unpaginated::new(1)),
            ctx.query.resource_url(resource_type, &entity.id()),
        ))
    }

    /// The related resources of one relationship of a resource
    ///
    /// Related entities render through their own descriptor, with the
    /// caller's attribute filter applied. A to-one relationship renders its
    /// first entity, or `null` when there is none.
    pub fn relationship(
        ctx: RenderContext<'a>,
        resource_type: &str,
        id: &str,
        relationship: &str,
        related: Vec<&'a dyn Resource>,
    ) -> EngineResult<Self> {
        let (descriptor, rel) = Self::relationship_of(ctx, resource_type, relationship)?;
        let related_descriptor = ctx.registry.require(&rel.related_type)?;
        let count = if rel.many {
            related.len()
        } else {
            related.len().min(1)
        };
        Ok(Self::build(
            ctx,
            descriptor,
            ViewType::Relationship,
            Body::Related {
                descriptor: related_descriptor,
                entities: related,
                many: rel.many,
            },
            Pages::Unpaginated(Unpaginated::new(count as u64)),
            Self::relationship_link(ctx, resource_type, id, relationship),
        ))
    }

    /// A relationship document carrying identifiers only, as returned after a change
    pub fn relationship_linkage(
        ctx: RenderContext<'a>,
        resource_type: &str,
        id: &str,
        relationship: &str,
        linkage: ResourceLinkage,
    ) -> EngineResult<Self> {
        let (descriptor, _) = Self::relationship_of(ctx, resource_type, relationship)?;
        let count = linkage.ids().len() as u64;
        Ok(Self::build(
            ctx,
            descriptor,
            ViewType::Relationship,
            Body::Linkage(linkage),
            Pages::Unpaginated(Unpaginated::new(count)),
            Self::relationship_link(ctx, resource_type, id, relationship),
        ))
    }

    fn relationship_of(
        ctx: RenderContext<'a>,
        resource_type: &str,
        relationship: &str,
    ) -> EngineResult<(&'a ViewDescriptor, &'a RelationshipDescriptor)> {
        let descriptor: &'a ViewDescriptor = ctx.registry.require(resource_type)?;
        let rel = descriptor.relationship_named(relationship).ok_or_else(|| {
            EngineError::UnsupportedRelationship {
                resource_type: resource_type.to_string(),
                relationship: relationship.to_string(),
            }
        })?;
        Ok((descriptor, rel))
    }

    fn relationship_link(ctx: RenderContext<'a>, resource_type: &str, id: &str, relationship: &str) -> String {
        format!(
            "{}/relationships/{}",
            ctx.query.resource_url(resource_type, id),
            relationship
        )
    }

    /// Merge caller-supplied meta; keys of the page block take precedence
    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta.extend(meta);
        self
    }

    /// Attach errors; a document with errors renders the error branch
    pub fn with_errors<I>(mut self, errors: I) -> Self
    where
        I: IntoIterator<Item = EngineError>,
    {
        self.errors
            .extend(errors.into_iter().map(|e| e.to_error_object()));
        self
    }

    /// Replace the `self` link of a non-collection document
    pub fn with_self_link(mut self, link: impl Into<String>) -> Self {
        self.self_link = link.into();
        self
    }

    pub fn view_type(&self) -> ViewType {
        self.view
    }

    pub fn resource_type(&self) -> &str {
        self.descriptor.resource_type()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ErrorObject] {
        &self.errors
    }

    /// Page accessors of this document
    pub fn pagination(&self) -> &dyn Pagination {
        match &self.pages {
            Pages::Cursor(cursor) => cursor as &dyn Pagination,
            Pages::Unpaginated(pages) => pages as &dyn Pagination,
        }
    }

    fn views(&self) -> Vec<ResourceView<'a>> {
        match &self.body {
            Body::Resources(entities) => entities
                .iter()
                .map(|entity| ResourceView::new(self.ctx, self.descriptor, *entity))
                .collect(),
            Body::Related {
                descriptor,
                entities,
                ..
            } => entities
                .iter()
                .map(|entity| ResourceView::new(self.ctx, *descriptor, *entity))
                .collect(),
            Body::Linkage(_) => Vec::new(),
        }
    }

    /// Primary data for the current view
    pub fn data(&self) -> Option<PrimaryData> {
        match (self.view, &self.body) {
            (ViewType::Meta, _) => None,
            (_, Body::Linkage(linkage)) => Some(PrimaryData::Linkage(linkage.clone())),
            (_, Body::Related { many: true, .. }) => Some(PrimaryData::Many(
                self.views().iter().map(ResourceView::render).collect(),
            )),
            (_, Body::Related { many: false, .. }) => Some(
                self.views()
                    .first()
                    .map(|view| PrimaryData::One(Box::new(view.render())))
                    .unwrap_or(PrimaryData::Linkage(ResourceLinkage::One(None))),
            ),
            (ViewType::Collection, Body::Resources(_)) => Some(PrimaryData::Many(
                self.views().iter().map(ResourceView::render).collect(),
            )),
            (_, Body::Resources(_)) => self
                .views()
                .first()
                .map(|view| PrimaryData::One(Box::new(view.render()))),
        }
    }

    /// Related resources of every primary resource, each identity once
    pub fn included(&self) -> Option<Vec<ResourceObject>> {
        if !matches!(self.view, ViewType::Collection | ViewType::Individual) {
            return None;
        }
        let views = self.views();
        let mut included = IncludedSet::new();
        for view in &views {
            included.visit(view.resource_type(), &view.id());
        }
        for view in &views {
            view.generate_includes(&mut included);
        }
        Some(included.into_vec())
    }

    pub fn links(&self) -> Links {
        match &self.pages {
            Pages::Cursor(cursor) => {
                let size = cursor.limit().unwrap_or(1);
                let link = |page| cursor_link(&self.self_link, size, page);
                Links {
                    self_link: link(cursor.current_page()),
                    first: link(cursor.first_page()),
                    last: link(cursor.last_page().map(|last| last.max(1))),
                    previous: link(cursor.previous_page()),
                    next: link(cursor.next_page()),
                }
            }
            Pages::Unpaginated(_) => Links {
                self_link: Some(self.self_link.clone()),
                ..Links::default()
            },
        }
    }

    /// The `meta` member: page block first for collections, then caller meta
    pub fn meta_block(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        if let Pages::Cursor(cursor) = &self.pages {
            if let Ok(Value::Object(page)) = serde_json::to_value(PageMeta::from_pagination(cursor)) {
                meta.extend(page);
            }
        }
        for (key, value) in &self.meta {
            if !meta.contains_key(key) {
                meta.insert(key.clone(), value.clone());
            }
        }
        meta
    }

    pub fn jsonapi(&self) -> JsonApiInfo {
        JsonApiInfo::new(self.ctx.api_version)
    }

    /// Render the whole document
    pub fn render(&self) -> WireDocument {
        tracing::debug!(
            resource_type = %self.resource_type(),
            view = self.view.as_str(),
            errors = self.errors.len(),
            "rendering document"
        );

        if self.has_errors() {
            return WireDocument {
                data: None,
                errors: Some(self.errors.clone()),
                meta: self.meta_block(),
                links: self.links(),
                included: None,
                jsonapi: self.jsonapi(),
            };
        }

        WireDocument {
            data: self.data(),
            errors: None,
            meta: self.meta_block(),
            links: self.links(),
            included: self.included(),
            jsonapi: self.jsonapi(),
        }
    }

    /// Render and serialize to JSON
    pub fn to_wire_string(&self) -> EngineResult<String> {
        Ok(serde_json::to_string(&self.render())?)
    }
}
