//! Built-in Fuel Rats resources
//!
//! The descriptor catalogue ships as YAML (see `fuelrats.yaml`) and is loaded
//! through [`EngineConfig::fuelrats`](crate::config::EngineConfig::fuelrats).
//! This module adds what cannot be data: the relationship change sets with
//! their guards, and the build information rendered by the `version` resource.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::core::query::QueryContext;
use crate::core::resource::Resource;
use crate::relationships::{RelationshipChange, RelationshipChanges, RelationshipStore};

/// YAML source of the built-in descriptor catalogue
pub const CATALOGUE: &str = include_str!("fuelrats.yaml");

/// Whether the caller may attach `rat_id` as a ship's rat
///
/// Owners may move a ship between their own rats; anyone else needs `rats.write`.
pub fn ship_rat_guard(query: &QueryContext, ship: &dyn Resource, rat_id: &str) -> bool {
    let owns = |id: &str| query.caller().is_some_and(|caller| caller.owns(id));
    let owns_current = ship
        .attribute("ratId")
        .as_ref()
        .and_then(Value::as_str)
        .is_some_and(owns);
    (owns_current && owns(rat_id)) || query.permissions().contains("rats.write")
}

/// Changeable relationships of rescues
pub fn rescue_changes(store: Arc<dyn RelationshipStore>) -> RelationshipChanges {
    RelationshipChanges::new("rescues")
        .register(RelationshipChange::new("rats", store.clone()))
        .register(RelationshipChange::new("firstLimpet", store))
}

/// Changeable relationships of ships
///
/// The rat of a ship can be set but never removed.
pub fn ship_changes(store: Arc<dyn RelationshipStore>) -> RelationshipChanges {
    RelationshipChanges::new("ships").register(
        RelationshipChange::new("rat", store)
            .with_guard(ship_rat_guard)
            .without_remove(),
    )
}

/// Build information of the running API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub version: String,
    #[serde(default, alias = "hash")]
    pub commit: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl BuildInfo {
    /// Information compiled into this binary
    ///
    /// `FUELRATS_BUILD_COMMIT` and `FUELRATS_BUILD_BRANCH` are read at compile time.
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            commit: option_env!("FUELRATS_BUILD_COMMIT").map(str::to_string),
            branch: option_env!("FUELRATS_BUILD_BRANCH").map(str::to_string),
            tags: Vec::new(),
            date: None,
        }
    }

    /// Load a `build.json` written by the release pipeline
    pub fn from_json_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl Resource for BuildInfo {
    fn id(&self) -> String {
        self.version.clone()
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "version" => Some(Value::String(self.version.clone())),
            "commit" => self.commit.clone().map(Value::String),
            "branch" => self.branch.clone().map(Value::String),
            "tags" => Some(Value::from(self.tags.clone())),
            "date" => self.date.map(|date| Value::String(date.to_rfc3339())),
            _ => None,
        }
    }
}
