//! Generic add / patch / remove over relationships
//!
//! Every resource type declares its changeable relationships once as
//! [`RelationshipChange`]s; the same [`RelationshipChanges::apply`] then
//! performs the checks and delegates to the injected store.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::core::error::{EngineError, EngineResult};
use crate::core::permission::{AccessMode, grant_name};
use crate::core::query::QueryContext;
use crate::core::resource::Resource;
use crate::document::wire::{ResourceIdentifier, ResourceLinkage};
use crate::relationships::store::RelationshipStore;
use crate::view::ResourceView;

/// A relationship change operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    /// Attach ids (`POST .../relationships/<name>`)
    Add,
    /// Replace the relationship (`PATCH .../relationships/<name>`)
    Patch,
    /// Detach ids (`DELETE .../relationships/<name>`)
    Remove,
}

impl ChangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOp::Add => "add",
            ChangeOp::Patch => "patch",
            ChangeOp::Remove => "remove",
        }
    }
}

/// Requested related ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Linkage {
    One(Option<String>),
    Many(Vec<String>),
}

impl Linkage {
    /// Parse the `data` member of a relationship request body
    ///
    /// Every identifier must carry `expected_type`.
    pub fn from_document(body: &Value, expected_type: &str) -> EngineResult<Self> {
        let identify = |value: &Value, pointer: &str| -> EngineResult<String> {
            let identifier: ResourceIdentifier =
                serde_json::from_value(value.clone()).map_err(|e| EngineError::BadRequest {
                    message: e.to_string(),
                    pointer: Some(pointer.to_string()),
                })?;
            if identifier.resource_type != expected_type {
                return Err(EngineError::Conflict {
                    pointer: format!("{}/type", pointer),
                });
            }
            Ok(identifier.id)
        };

        match body.get("data") {
            Some(Value::Null) => Ok(Linkage::One(None)),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| identify(item, &format!("/data/{}", index)))
                .collect::<EngineResult<Vec<_>>>()
                .map(Linkage::Many),
            Some(item @ Value::Object(_)) => identify(item, "/data").map(|id| Linkage::One(Some(id))),
            _ => Err(EngineError::BadRequest {
                message: "relationship requests need a data member".to_string(),
                pointer: Some("/data".to_string()),
            }),
        }
    }

    pub fn ids(&self) -> Vec<String> {
        match self {
            Linkage::One(id) => id.iter().cloned().collect(),
            Linkage::Many(ids) => ids.clone(),
        }
    }
}

/// Extra predicate gating a change beyond the tier check
///
/// Called once per requested id with the request, the owning entity and the id.
pub type ChangeGuard = Arc<dyn Fn(&QueryContext, &dyn Resource, &str) -> bool + Send + Sync>;

/// One changeable relationship
#[derive(Clone)]
pub struct RelationshipChange {
    name: String,
    store: Arc<dyn RelationshipStore>,
    guard: Option<ChangeGuard>,
    removable: bool,
}

impl fmt::Debug for RelationshipChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationshipChange")
            .field("name", &self.name)
            .field("guard", &self.guard.is_some())
            .field("removable", &self.removable)
            .finish()
    }
}

impl RelationshipChange {
    pub fn new(name: impl Into<String>, store: Arc<dyn RelationshipStore>) -> Self {
        Self {
            name: name.into(),
            store,
            guard: None,
            removable: true,
        }
    }

    pub fn with_guard<F>(mut self, guard: F) -> Self
    where
        F: Fn(&QueryContext, &dyn Resource, &str) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Reject `remove` with `NotImplemented`
    pub fn without_remove(mut self) -> Self {
        self.removable = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Changeable relationships of one resource type
#[derive(Debug, Clone)]
pub struct RelationshipChanges {
    resource_type: String,
    changes: IndexMap<String, RelationshipChange>,
}

impl RelationshipChanges {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            changes: IndexMap::new(),
        }
    }

    pub fn register(mut self, change: RelationshipChange) -> Self {
        self.changes.insert(change.name.clone(), change);
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    /// Get a change descriptor or fail with `UnsupportedRelationship`
    pub fn get(&self, name: &str) -> EngineResult<&RelationshipChange> {
        self.changes
            .get(name)
            .ok_or_else(|| EngineError::UnsupportedRelationship {
                resource_type: self.resource_type.clone(),
                relationship: name.to_string(),
            })
    }

    fn owner(view: &ResourceView<'_>) -> ResourceIdentifier {
        ResourceIdentifier::new(view.resource_type(), view.id())
    }

    /// Apply a change to a relationship of the viewed entity
    ///
    /// Checks run in order: relationship known, write tier, linkage shape,
    /// guard for every id. Returns the linkage after the change.
    pub async fn apply(
        &self,
        view: &ResourceView<'_>,
        name: &str,
        op: ChangeOp,
        linkage: Linkage,
    ) -> EngineResult<ResourceLinkage> {
        let change = self.get(name)?;
        let relationship = view.require_relationship_write(name)?;
        let pointer = format!("/data/relationships/{}", name);

        match (&linkage, relationship.many) {
            (Linkage::Many(_), true) | (Linkage::One(_), false) => {}
            _ => {
                return Err(EngineError::BadRequest {
                    message: format!(
                        "'{}' is a to-{} relationship",
                        name,
                        if relationship.many { "many" } else { "one" }
                    ),
                    pointer: Some("/data".to_string()),
                });
            }
        }

        let ids = linkage.ids();
        if let Some(guard) = &change.guard {
            if let Some(denied) = ids.iter().find(|id| !guard(view.query(), view.entity(), id.as_str())) {
                tracing::warn!(
                    resource_type = %self.resource_type,
                    relationship = %name,
                    id = %denied,
                    "relationship change rejected by guard"
                );
                let permission = grant_name(
                    relationship.write,
                    view.descriptor().permission_namespace(),
                    AccessMode::Write,
                )
                .unwrap_or_else(|| relationship.write.to_string());
                return Err(EngineError::PermissionDenied {
                    permission,
                    pointer: Some(pointer),
                });
            }
        }

        let owner = Self::owner(view);
        match (op, relationship.many) {
            (ChangeOp::Add, true) => change.store.add(&owner, name, &ids).await?,
            (ChangeOp::Add, false) | (ChangeOp::Patch, _) => {
                change.store.set(&owner, name, &ids).await?
            }
            (ChangeOp::Remove, _) if !change.removable => {
                return Err(EngineError::NotImplemented {
                    operation: format!("{}.{}.remove", self.resource_type, name),
                });
            }
            (ChangeOp::Remove, _) => change.store.remove(&owner, name, &ids).await?,
        }

        tracing::info!(
            resource_type = %self.resource_type,
            id = %owner.id,
            relationship = %name,
            op = op.as_str(),
            count = ids.len(),
            "relationship changed"
        );

        self.linkage(&owner, name, relationship.many, &relationship.related_type, change)
            .await
    }

    /// Read the current linkage of a relationship of the viewed entity
    pub async fn read(&self, view: &ResourceView<'_>, name: &str) -> EngineResult<ResourceLinkage> {
        let change = self.get(name)?;
        let relationship = view.require_relationship_read(name)?;
        let owner = Self::owner(view);
        self.linkage(&owner, name, relationship.many, &relationship.related_type, change)
            .await
    }

    async fn linkage(
        &self,
        owner: &ResourceIdentifier,
        name: &str,
        many: bool,
        related_type: &str,
        change: &RelationshipChange,
    ) -> EngineResult<ResourceLinkage> {
        let ids = change.store.read(owner, name).await?;
        let identify = |id: String| ResourceIdentifier::new(related_type, id);
        Ok(if many {
            ResourceLinkage::Many(ids.into_iter().map(identify).collect())
        } else {
            ResourceLinkage::One(ids.into_iter().next().map(identify))
        })
    }
}
