//! Post-render notifications
//!
//! Nothing is emitted while a document renders. After a successful write the
//! collaborator layer calls [`EventBus::notify`] with the document it is about
//! to send; websocket or webhook fan-out subscribes to the bus.
//!
//! ```text
//! handler ──▶ Document::render() ──▶ EventBus::notify() ──▶ broadcast channel ──▶ subscribers
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let bus = EventBus::new(1024);
//! let mut rx = bus.subscribe();
//!
//! let document = Document::individual(ctx, "rescues", Some(&rescue))?;
//! bus.notify(ResourceAction::Updated, &document);
//!
//! if let Ok(envelope) = rx.recv().await {
//!     println!("{} {}", envelope.event.resource_type, envelope.event.action.as_str());
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::document::{Document, PrimaryData, WireDocument};

/// What happened to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceAction {
    Created,
    Updated,
    Deleted,
    RelationshipChanged,
}

impl ResourceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceAction::Created => "created",
            ResourceAction::Updated => "updated",
            ResourceAction::Deleted => "deleted",
            ResourceAction::RelationshipChanged => "relationship_changed",
        }
    }
}

/// A change to one resource, with the document rendered for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceEvent {
    pub resource_type: String,
    /// `None` when the document carried no single primary resource
    pub resource_id: Option<String>,
    pub action: ResourceAction,
    pub document: WireDocument,
}

impl ResourceEvent {
    pub fn new(resource_type: impl Into<String>, action: ResourceAction, document: WireDocument) -> Self {
        let resource_id = match &document.data {
            Some(PrimaryData::One(resource)) => Some(resource.id.clone()),
            _ => None,
        };
        Self {
            resource_type: resource_type.into(),
            resource_id,
            action,
            document,
        }
    }
}

/// Envelope wrapping an event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    pub event: ResourceEvent,
}

impl EventEnvelope {
    pub fn new(event: ResourceEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Broadcast-based event bus
///
/// Cheap to clone; all clones publish to the same subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    ///
    /// Slow receivers start losing events (lagged) once `capacity` events are
    /// buffered.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers
    ///
    /// Never fails. Returns the number of receivers that will get the event,
    /// zero when nobody is subscribed.
    pub fn publish(&self, event: ResourceEvent) -> usize {
        self.sender.send(EventEnvelope::new(event)).unwrap_or(0)
    }

    /// Render `document` and publish it as a `action` event
    ///
    /// Documents in the error branch are not published.
    pub fn notify(&self, action: ResourceAction, document: &Document<'_>) -> usize {
        if document.has_errors() {
            tracing::debug!(
                resource_type = %document.resource_type(),
                "not notifying for an error document"
            );
            return 0;
        }
        let event = ResourceEvent::new(document.resource_type(), action, document.render());
        tracing::debug!(
            resource_type = %event.resource_type,
            action = action.as_str(),
            "resource event"
        );
        self.publish(event)
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Get the current number of active subscribers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::QueryContext;
    use crate::core::resource::{Record, Resource};
    use crate::view::{RenderContext, ViewDescriptor, ViewRegistry};
    use serde_json::json;

    fn registry() -> ViewRegistry {
        let mut registry = ViewRegistry::new();
        registry
            .register(ViewDescriptor::new("rescues").attribute("system", None, None))
            .unwrap();
        registry
    }

    #[test]
    fn test_action_serialization() {
        assert_eq!(
            serde_json::to_value(ResourceAction::RelationshipChanged).unwrap(),
            json!("relationship_changed")
        );
        assert_eq!(ResourceAction::Created.as_str(), "created");
    }

    #[tokio::test]
    async fn test_notify_publishes_rendered_document() {
        let registry = registry();
        let query = QueryContext::new("http://localhost");
        let rescue = Record::new("r1").attr("system", json!("Sol"));
        let document = Document::individual(
            RenderContext::new(&registry, &query),
            "rescues",
            Some(&rescue as &dyn Resource),
        )
        .unwrap();

        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        assert_eq!(bus.notify(ResourceAction::Updated, &document), 1);

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event.resource_type, "rescues");
        assert_eq!(envelope.event.resource_id.as_deref(), Some("r1"));
        assert_eq!(envelope.event.action, ResourceAction::Updated);
        assert_eq!(envelope.event.document, document.render());
    }

    #[tokio::test]
    async fn test_error_documents_are_not_published() {
        let registry = registry();
        let query = QueryContext::new("http://localhost");
        let document =
            Document::individual(RenderContext::new(&registry, &query), "rescues", None).unwrap();

        let bus = EventBus::new(16);
        let _rx = bus.subscribe();
        assert_eq!(bus.notify(ResourceAction::Deleted, &document), 0);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_get_same_envelope() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);

        let event = ResourceEvent::new(
            "rats",
            ResourceAction::Created,
            WireDocument::from_errors(Vec::new()),
        );
        assert_eq!(bus.publish(event), 2);

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1.id, e2.id);
        assert!(e1.event.resource_id.is_none());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        let event = ResourceEvent::new(
            "rats",
            ResourceAction::Deleted,
            WireDocument::from_errors(Vec::new()),
        );
        assert_eq!(bus.publish(event), 0);
    }

    #[test]
    fn test_clones_share_subscribers() {
        let bus = EventBus::new(16);
        let _rx = bus.subscribe();
        let bus2 = bus.clone();
        assert_eq!(bus2.receiver_count(), 1);
    }
}
