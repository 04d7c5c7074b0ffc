//! The domain entity abstraction rendered by the engine
//!
//! The engine never loads data. Collaborators hand it values implementing
//! [`Resource`], with every relationship that should appear in `included`
//! already populated. [`Record`] is a ready-made, JSON-backed implementation
//! for collaborators that do not want to implement the trait on their own
//! model types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A loaded domain entity
pub trait Resource: Send + Sync {
    /// Stable identifier of this entity
    fn id(&self) -> String;

    /// Get the value of an attribute by name
    ///
    /// `None` renders as `null` when the attribute is visible.
    fn attribute(&self, name: &str) -> Option<Value>;

    /// Get the already-loaded data of a relationship
    ///
    /// Entities that never eagerly load a relationship keep the default.
    fn related(&self, _relationship: &str) -> Related<'_> {
        Related::NotLoaded
    }
}

/// Eagerly loaded relationship data
pub enum Related<'a> {
    /// The collaborator did not load this relationship
    NotLoaded,
    /// A to-one relationship, possibly empty
    One(Option<&'a dyn Resource>),
    /// A to-many relationship
    Many(Vec<&'a dyn Resource>),
}

impl<'a> Related<'a> {
    pub fn is_loaded(&self) -> bool {
        !matches!(self, Related::NotLoaded)
    }

    /// All loaded related entities, in declaration order
    pub fn entities(&self) -> Vec<&'a dyn Resource> {
        match self {
            Related::NotLoaded | Related::One(None) => Vec::new(),
            Related::One(Some(entity)) => vec![*entity],
            Related::Many(entities) => entities.clone(),
        }
    }
}

/// Relationship data held by a [`Record`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Loaded {
    Many(Vec<Record>),
    One(Option<Box<Record>>),
}

/// A JSON-backed entity
///
/// # Example
///
/// ```rust,ignore
/// let rat = Record::new("b5e0f1d2").attr("name", json!("Surly Badger"));
/// let ship = Record::new("9")
///     .attr("name", json!("Hard Bargain"))
///     .attr("ratId", json!("b5e0f1d2"))
///     .one("rat", Some(rat));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relationships: IndexMap<String, Loaded>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Attach a loaded to-one relationship
    pub fn one(mut self, name: impl Into<String>, related: Option<Record>) -> Self {
        self.relationships
            .insert(name.into(), Loaded::One(related.map(Box::new)));
        self
    }

    /// Attach a loaded to-many relationship
    pub fn many(mut self, name: impl Into<String>, related: Vec<Record>) -> Self {
        self.relationships.insert(name.into(), Loaded::Many(related));
        self
    }
}

impl Resource for Record {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes.get(name).cloned()
    }

    fn related(&self, relationship: &str) -> Related<'_> {
        match self.relationships.get(relationship) {
            None => Related::NotLoaded,
            Some(Loaded::One(entity)) => {
                Related::One(entity.as_deref().map(|e| e as &dyn Resource))
            }
            Some(Loaded::Many(entities)) => {
                Related::Many(entities.iter().map(|e| e as &dyn Resource).collect())
            }
        }
    }
}
