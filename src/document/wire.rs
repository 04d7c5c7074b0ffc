//! Wire types of a JSON:API document
//!
//! These serialize to the exact key names of the protocol. Optional members
//! are skipped rather than rendered as `null`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::error::ErrorObject;

/// Version of the JSON:API protocol every document declares
pub const JSON_API_VERSION: &str = "1.0";

/// `{ type, id }` reference to a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

/// Resource linkage of a relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceLinkage {
    Many(Vec<ResourceIdentifier>),
    One(Option<ResourceIdentifier>),
}

impl ResourceLinkage {
    pub fn ids(&self) -> Vec<&str> {
        match self {
            ResourceLinkage::Many(items) => items.iter().map(|i| i.id.as_str()).collect(),
            ResourceLinkage::One(item) => item.iter().map(|i| i.id.as_str()).collect(),
        }
    }
}

/// Links of one relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    pub related: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipObject {
    pub links: RelationshipLinks,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResourceLinkage>,
}

/// A rendered resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
    pub attributes: Map<String, Value>,
    pub relationships: IndexMap<String, RelationshipObject>,
}

impl ResourceObject {
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(&self.resource_type, &self.id)
    }
}

/// Primary data of a successful document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<ResourceObject>),
    One(Box<ResourceObject>),
    Linkage(ResourceLinkage),
}

/// Top-level links, serialized in the order self, first, last, previous, next
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    #[serde(rename = "self", skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonApiMeta {
    pub api_version: String,
}

/// The `jsonapi` member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonApiInfo {
    pub version: String,
    pub meta: JsonApiMeta,
}

impl JsonApiInfo {
    pub fn new(api_version: impl Into<String>) -> Self {
        Self {
            version: JSON_API_VERSION.to_string(),
            meta: JsonApiMeta {
                api_version: api_version.into(),
            },
        }
    }
}

impl Default for JsonApiInfo {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"))
    }
}

/// A rendered document, ready to serialize
///
/// `data` and `errors` are never both present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PrimaryData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorObject>>,
    pub meta: Map<String, Value>,
    pub links: Links,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included: Option<Vec<ResourceObject>>,
    pub jsonapi: JsonApiInfo,
}

impl WireDocument {
    /// A bare error document, used when no document could be assembled
    pub fn from_errors(errors: Vec<ErrorObject>) -> Self {
        Self {
            data: None,
            errors: Some(errors),
            meta: Map::new(),
            links: Links::default(),
            included: None,
            jsonapi: JsonApiInfo::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_links_key_order_and_omission() {
        let links = Links {
            self_link: Some("s".to_string()),
            first: Some("f".to_string()),
            last: Some("l".to_string()),
            previous: None,
            next: Some("n".to_string()),
        };
        assert_eq!(
            serde_json::to_string(&links).unwrap(),
            r#"{"self":"s","first":"f","last":"l","next":"n"}"#
        );
    }

    #[test]
    fn test_linkage_shapes() {
        let one = ResourceLinkage::One(Some(ResourceIdentifier::new("rats", "r1")));
        assert_eq!(
            serde_json::to_value(&one).unwrap(),
            json!({"type": "rats", "id": "r1"})
        );
        assert_eq!(
            serde_json::to_value(ResourceLinkage::One(None)).unwrap(),
            Value::Null
        );
        let many = ResourceLinkage::Many(vec![ResourceIdentifier::new("rats", "r1")]);
        assert_eq!(many.ids(), vec!["r1"]);
    }

    #[test]
    fn test_jsonapi_block() {
        let info = JsonApiInfo::new("3.0.0");
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({"version": "1.0", "meta": {"apiVersion": "3.0.0"}})
        );
        assert_eq!(JsonApiInfo::default().meta.api_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_error_document_has_no_data() {
        let document = WireDocument::from_errors(Vec::new());
        let json = serde_json::to_value(&document).unwrap();
        assert!(json.get("data").is_none());
        assert!(json.get("included").is_none());
        assert_eq!(json["errors"], json!([]));
    }
}
