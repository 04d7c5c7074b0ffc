//! Relationship change protocol

pub mod change;
pub mod store;

pub use change::{ChangeGuard, ChangeOp, Linkage, RelationshipChange, RelationshipChanges};
pub use store::RelationshipStore;
