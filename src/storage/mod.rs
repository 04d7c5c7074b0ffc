//! Storage implementations of the relationship store

pub mod in_memory;

pub use in_memory::InMemoryRelationshipStore;
