//! Self predicates
//!
//! A self rule decides whether the caller is the rendered entity's own
//! subject. Only then does a `.me` grant lift the caller to the `self` tier.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::core::permission::Caller;
use crate::core::resource::Resource;

/// A self predicate registered in code
pub type SelfCheck = Arc<dyn Fn(&dyn Resource, &Caller) -> bool + Send + Sync>;

/// Data-driven self predicate
///
/// # Example (YAML)
///
/// ```yaml
/// self_rule:
///   kind: owned_attribute
///   attribute: ratId
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelfRule {
    /// Nobody is ever the subject
    #[default]
    None,
    /// The entity is the caller's user record
    User,
    /// An attribute holds the caller's user id
    UserAttribute { attribute: String },
    /// An attribute holds an id the caller owns (a rat id)
    OwnedAttribute { attribute: String },
    /// Any loaded entity of these relationships is owned by the caller
    OwnedRelated { relationships: Vec<String> },
}

fn as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl SelfRule {
    pub fn evaluate(&self, entity: &dyn Resource, caller: &Caller) -> bool {
        match self {
            SelfRule::None => false,
            SelfRule::User => caller.is_user(&entity.id()),
            SelfRule::UserAttribute { attribute } => entity
                .attribute(attribute)
                .and_then(|v| as_id(&v))
                .is_some_and(|id| caller.is_user(&id)),
            SelfRule::OwnedAttribute { attribute } => match entity.attribute(attribute) {
                Some(Value::Array(values)) => values
                    .iter()
                    .filter_map(as_id)
                    .any(|id| caller.owns(&id)),
                Some(value) => as_id(&value).is_some_and(|id| caller.owns(&id)),
                None => false,
            },
            SelfRule::OwnedRelated { relationships } => relationships.iter().any(|name| {
                entity
                    .related(name)
                    .entities()
                    .iter()
                    .any(|related| caller.owns(&related.id()))
            }),
        }
    }
}
