//! Persistence seam of the relationship change protocol

use async_trait::async_trait;

use crate::core::error::{EngineError, EngineResult};
use crate::document::wire::ResourceIdentifier;

/// Mutators for relationship data, implemented by the persistence layer
///
/// Ids are related-resource ids in request order. A to-one relationship is
/// stored as zero or one id.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Append ids to a relationship, ignoring ids already present
    async fn add(&self, owner: &ResourceIdentifier, relationship: &str, ids: &[String]) -> EngineResult<()>;

    /// Replace the relationship with exactly `ids`
    async fn set(&self, owner: &ResourceIdentifier, relationship: &str, ids: &[String]) -> EngineResult<()>;

    /// Detach ids from a relationship
    async fn remove(&self, owner: &ResourceIdentifier, relationship: &str, _ids: &[String]) -> EngineResult<()> {
        Err(EngineError::NotImplemented {
            operation: format!("{}.{}.remove", owner.resource_type, relationship),
        })
    }

    /// Current ids of a relationship
    async fn read(&self, owner: &ResourceIdentifier, relationship: &str) -> EngineResult<Vec<String>>;
}
