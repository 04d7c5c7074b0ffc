//! # Fuel Rats API document engine
//!
//! Turns loaded domain entities into JSON:API documents while enforcing
//! per-field, per-caller visibility and mutability.
//!
//! ## Features
//!
//! - **Declarative Views**: Each resource type is a YAML descriptor (attributes, tiers, relationships)
//! - **Permission Tiers**: `all < self < group < internal < sudo`, resolved once per resource
//! - **Self Rules**: Ownership checks by user id, owned attribute or owned relationship
//! - **Includes**: Cycle-safe, deduplicated `included` generation
//! - **Pagination**: Page meta and `self`/`first`/`last`/`previous`/`next` links
//! - **Relationship Changes**: Add / patch / remove linkage through an async store
//! - **Events**: Explicit post-render notifications over a broadcast bus
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fuelrats::prelude::*;
//!
//! let engine = Engine::fuelrats()?;
//! let query = engine
//!     .query_with(&QueryParams::from_pairs([("page[size]", "25")])?)?
//!     .with_caller(caller, permissions);
//!
//! let rescue = Record::new("3f1c...")
//!     .attr("system", json!("Sol"))
//!     .attr("notes", json!("client reconnected"));
//!
//! let document = Document::individual(engine.context(&query), "rescues", Some(&rescue as &dyn Resource))?;
//! let body = document.to_wire_string()?;
//! ```

pub mod config;
pub mod core;
pub mod document;
pub mod engine;
pub mod logging;
pub mod relationships;
pub mod resources;
pub mod storage;
pub mod view;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        error::{EngineError, EngineResult, ErrorObject, ErrorSource},
        events::{EventBus, EventEnvelope, ResourceAction, ResourceEvent},
        pagination::{PageCursor, PageMeta, Pagination, Unpaginated},
        permission::{AccessMode, Caller, PermissionSet, Tier, grant},
        query::{PageRequest, QueryContext, QueryParams, SortField},
        resource::{Loaded, Record, Related, Resource},
    };

    // === Config ===
    pub use crate::config::{
        AttributeConfig, EngineConfig, PaginationConfig, RelationshipConfig, ResourceConfig,
    };

    // === Views ===
    pub use crate::view::{
        AttributeRule, RelationshipDescriptor, RenderContext, ResourceView, SelfCheck, SelfRule,
        ViewDescriptor, ViewRegistry,
    };

    // === Documents ===
    pub use crate::document::{
        Document, IncludedSet, JsonApiInfo, Links, PrimaryData, RelationshipLinks,
        RelationshipObject, ResourceIdentifier, ResourceLinkage, ResourceObject, ViewType,
        WireDocument,
    };

    // === Relationships ===
    pub use crate::relationships::{
        ChangeGuard, ChangeOp, Linkage, RelationshipChange, RelationshipChanges,
        RelationshipStore,
    };

    // === Storage ===
    pub use crate::storage::InMemoryRelationshipStore;

    // === Built-in resources ===
    pub use crate::engine::Engine;
    pub use crate::resources::{BuildInfo, rescue_changes, ship_changes, ship_rat_guard};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Map, Value, json};
    pub use uuid::Uuid;
}
