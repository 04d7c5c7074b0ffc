//! Configuration loading and management
//!
//! Resource view descriptors are data, not types: each resource type is a
//! [`ResourceConfig`] entry loaded once at startup (usually from YAML) and
//! turned into an immutable [`ViewRegistry`](crate::view::ViewRegistry).

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::permission::Tier;
use crate::view::SelfRule;

fn default_external_url() -> String {
    "http://localhost:8080".to_string()
}

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Public base URL used to build every link
    #[serde(default = "default_external_url")]
    pub external_url: String,

    /// Overrides the `jsonapi.meta.apiVersion` tag (defaults to the crate version)
    #[serde(default)]
    pub api_version: Option<String>,

    #[serde(default)]
    pub pagination: PaginationConfig,

    /// One entry per resource type
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

/// Page size limits
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub default_size: u64,

    #[serde(default = "default_page_size")]
    pub max_size: u64,
}

fn default_page_size() -> u64 {
    100
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_size: default_page_size(),
            max_size: default_page_size(),
        }
    }
}

/// Declarative view descriptor of one resource type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource type name (e.g., "rescues")
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Permission namespace, defaults to the type name
    #[serde(default)]
    pub namespace: Option<String>,

    /// Read tier for attributes that do not declare one
    #[serde(default)]
    pub default_read: Tier,

    /// How to decide whether the caller is the resource's own subject
    #[serde(default)]
    pub self_rule: SelfRule,

    /// Attributes in rendering order
    #[serde(default)]
    pub attributes: Vec<AttributeConfig>,

    #[serde(default)]
    pub relationships: Vec<RelationshipConfig>,
}

/// Read and write tiers of one attribute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeConfig {
    pub name: String,

    /// Falls back to the resource's `default_read`
    #[serde(default)]
    pub read: Option<Tier>,

    /// Absent means the attribute is never writable
    #[serde(default)]
    pub write: Option<Tier>,
}

fn default_relationship_write() -> Tier {
    Tier::Group
}

/// A relationship to another resource type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipConfig {
    pub name: String,

    /// Type of the related resource
    #[serde(rename = "type")]
    pub related_type: String,

    /// To-many when true
    #[serde(default)]
    pub many: bool,

    #[serde(default)]
    pub read: Tier,

    #[serde(default = "default_relationship_write")]
    pub write: Tier,
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Merge several configurations
    ///
    /// Scalar settings come from the last configuration; a resource type
    /// declared more than once keeps its last declaration.
    pub fn merge(configs: Vec<EngineConfig>) -> Self {
        let mut merged = EngineConfig {
            external_url: default_external_url(),
            api_version: None,
            pagination: PaginationConfig::default(),
            resources: Vec::new(),
        };

        for config in configs {
            merged.external_url = config.external_url;
            merged.pagination = config.pagination;
            if config.api_version.is_some() {
                merged.api_version = config.api_version;
            }
            for resource in config.resources {
                match merged
                    .resources
                    .iter_mut()
                    .find(|r| r.resource_type == resource.resource_type)
                {
                    Some(existing) => *existing = resource,
                    None => merged.resources.push(resource),
                }
            }
        }

        merged
    }

    /// Find a resource declaration by type
    pub fn find_resource(&self, resource_type: &str) -> Option<&ResourceConfig> {
        self.resources
            .iter()
            .find(|r| r.resource_type == resource_type)
    }

    /// The built-in Fuel Rats resource catalogue
    pub fn fuelrats() -> Result<Self> {
        Self::from_yaml_str(crate::resources::CATALOGUE)
    }
}
