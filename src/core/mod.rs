//! Core types shared by every part of the engine

pub mod error;
pub mod events;
pub mod pagination;
pub mod permission;
pub mod query;
pub mod resource;

pub use error::{EngineError, EngineResult, ErrorObject, ErrorSource};
pub use events::{EventBus, EventEnvelope, ResourceAction, ResourceEvent};
pub use pagination::{PageCursor, PageMeta, Pagination, Unpaginated};
pub use permission::{AccessMode, Caller, PermissionSet, Tier, grant};
pub use query::{PageRequest, QueryContext, QueryParams, SortField};
pub use resource::{Loaded, Record, Related, Resource};
