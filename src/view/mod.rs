//! View descriptors and per-entity rendering

pub mod descriptor;
pub mod registry;
pub mod resource_view;
pub mod self_rule;

pub use descriptor::{AttributeRule, RelationshipDescriptor, ViewDescriptor};
pub use registry::ViewRegistry;
pub use resource_view::{RenderContext, ResourceView};
pub use self_rule::{SelfCheck, SelfRule};
