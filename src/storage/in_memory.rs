//! In-memory implementation of RelationshipStore for testing and development

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::core::error::{EngineError, EngineResult};
use crate::document::wire::ResourceIdentifier;
use crate::relationships::RelationshipStore;

type Key = (String, String, String);

fn key(owner: &ResourceIdentifier, relationship: &str) -> Key {
    (
        owner.resource_type.clone(),
        owner.id.clone(),
        relationship.to_string(),
    )
}

/// In-memory relationship store
///
/// Keeps ordered, duplicate-free id lists per `(owner type, owner id,
/// relationship)`. Clones share the same data.
#[derive(Clone, Debug)]
pub struct InMemoryRelationshipStore {
    relationships: Arc<RwLock<HashMap<Key, Vec<String>>>>,
}

impl InMemoryRelationshipStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            relationships: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryRelationshipStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelationshipStore for InMemoryRelationshipStore {
    async fn add(&self, owner: &ResourceIdentifier, relationship: &str, ids: &[String]) -> EngineResult<()> {
        let mut relationships = self
            .relationships
            .write()
            .map_err(|e| EngineError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        let current = relationships.entry(key(owner, relationship)).or_default();
        for id in ids {
            if !current.contains(id) {
                current.push(id.clone());
            }
        }
        Ok(())
    }

    async fn set(&self, owner: &ResourceIdentifier, relationship: &str, ids: &[String]) -> EngineResult<()> {
        let mut relationships = self
            .relationships
            .write()
            .map_err(|e| EngineError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        let mut unique: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(id) {
                unique.push(id.clone());
            }
        }
        relationships.insert(key(owner, relationship), unique);
        Ok(())
    }

    async fn remove(&self, owner: &ResourceIdentifier, relationship: &str, ids: &[String]) -> EngineResult<()> {
        let mut relationships = self
            .relationships
            .write()
            .map_err(|e| EngineError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        if let Some(current) = relationships.get_mut(&key(owner, relationship)) {
            current.retain(|id| !ids.contains(id));
        }
        Ok(())
    }

    async fn read(&self, owner: &ResourceIdentifier, relationship: &str) -> EngineResult<Vec<String>> {
        let relationships = self
            .relationships
            .read()
            .map_err(|e| EngineError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(relationships
            .get(&key(owner, relationship))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_add_keeps_order_without_duplicates() {
        let store = InMemoryRelationshipStore::new();
        let rescue = ResourceIdentifier::new("rescues", "r1");

        store.add(&rescue, "rats", &ids(&["a", "b"])).await.unwrap();
        store.add(&rescue, "rats", &ids(&["b", "c"])).await.unwrap();

        assert_eq!(store.read(&rescue, "rats").await.unwrap(), ids(&["a", "b", "c"]));
    }

    #[tokio::test]
    async fn test_set_replaces() {
        let store = InMemoryRelationshipStore::new();
        let ship = ResourceIdentifier::new("ships", "s1");

        store.set(&ship, "rat", &ids(&["rat-1"])).await.unwrap();
        store.set(&ship, "rat", &ids(&["rat-2"])).await.unwrap();
        assert_eq!(store.read(&ship, "rat").await.unwrap(), ids(&["rat-2"]));

        store.set(&ship, "rat", &[]).await.unwrap();
        assert!(store.read(&ship, "rat").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = InMemoryRelationshipStore::new();
        let rescue = ResourceIdentifier::new("rescues", "r1");

        store.set(&rescue, "rats", &ids(&["a", "b", "c"])).await.unwrap();
        store.remove(&rescue, "rats", &ids(&["b"])).await.unwrap();
        assert_eq!(store.read(&rescue, "rats").await.unwrap(), ids(&["a", "c"]));

        store
            .remove(&ResourceIdentifier::new("rescues", "unknown"), "rats", &ids(&["a"]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_clones_share_data() {
        let store = InMemoryRelationshipStore::new();
        let clone = store.clone();
        let rat = ResourceIdentifier::new("rats", "rat-1");

        store.add(&rat, "ships", &ids(&["s1"])).await.unwrap();
        assert_eq!(clone.read(&rat, "ships").await.unwrap(), ids(&["s1"]));
    }

    #[tokio::test]
    async fn test_relationships_are_isolated_by_owner() {
        let store = InMemoryRelationshipStore::new();
        store
            .add(&ResourceIdentifier::new("rescues", "r1"), "rats", &ids(&["a"]))
            .await
            .unwrap();
        assert!(
            store
                .read(&ResourceIdentifier::new("rescues", "r2"), "rats")
                .await
                .unwrap()
                .is_empty()
        );
    }
}
