//! Integration tests for relationship changes against the in-memory store

use fuelrats::prelude::*;
use std::sync::Arc;

fn owner_of(rats: &[&str], grants: &[&str], engine: &Engine) -> QueryContext {
    engine.query().with_caller(
        Caller::new(Uuid::new_v4()).with_owned(rats.iter().copied()),
        grants.iter().copied().collect(),
    )
}

fn ship() -> Record {
    Record::new("s1")
        .attr("name", json!("Hard Bargain"))
        .attr("ratId", json!("rat-1"))
}

fn rescue() -> Record {
    Record::new("r1").many("rats", vec![Record::new("rat-1")])
}

mod ship_rat_tests {
    use super::*;

    #[tokio::test]
    async fn test_patch_then_read_returns_new_rat() {
        let engine = Engine::fuelrats().unwrap();
        let store = Arc::new(InMemoryRelationshipStore::new());
        let changes = ship_changes(store);

        let ship = ship();
        let query = owner_of(&["rat-1", "rat-2"], &["ships.write.me"], &engine);
        let view = ResourceView::of_type(engine.context(&query), "ships", &ship).unwrap();

        let linkage = changes
            .apply(&view, "rat", ChangeOp::Patch, Linkage::One(Some("rat-2".to_string())))
            .await
            .unwrap();
        let expected = ResourceLinkage::One(Some(ResourceIdentifier::new("rats", "rat-2")));
        assert_eq!(linkage, expected);
        assert_eq!(changes.read(&view, "rat").await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_guard_rejects_foreign_rat() {
        let engine = Engine::fuelrats().unwrap();
        let changes = ship_changes(Arc::new(InMemoryRelationshipStore::new()));

        let ship = ship();
        let query = owner_of(&["rat-1"], &["ships.write.me"], &engine);
        let view = ResourceView::of_type(engine.context(&query), "ships", &ship).unwrap();

        let err = changes
            .apply(&view, "rat", ChangeOp::Add, Linkage::One(Some("rat-9".to_string())))
            .await
            .unwrap_err();
        match err {
            EngineError::PermissionDenied { pointer, .. } => {
                assert_eq!(pointer.as_deref(), Some("/data/relationships/rat"))
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(changes.read(&view, "rat").await.unwrap(), ResourceLinkage::One(None));
    }

    #[tokio::test]
    async fn test_rats_write_bypasses_ownership() {
        let engine = Engine::fuelrats().unwrap();
        let changes = ship_changes(Arc::new(InMemoryRelationshipStore::new()));

        let ship = ship();
        let query = owner_of(&[], &["ships.write", "rats.write"], &engine);
        let view = ResourceView::of_type(engine.context(&query), "ships", &ship).unwrap();

        let linkage = changes
            .apply(&view, "rat", ChangeOp::Patch, Linkage::One(Some("rat-9".to_string())))
            .await
            .unwrap();
        assert_eq!(linkage.ids(), vec!["rat-9"]);
    }

    #[tokio::test]
    async fn test_remove_is_not_implemented() {
        let engine = Engine::fuelrats().unwrap();
        let changes = ship_changes(Arc::new(InMemoryRelationshipStore::new()));

        let ship = ship();
        let query = owner_of(&["rat-1", "rat-2"], &["ships.write.me"], &engine);
        let view = ResourceView::of_type(engine.context(&query), "ships", &ship).unwrap();

        let err = changes
            .apply(&view, "rat", ChangeOp::Remove, Linkage::One(Some("rat-2".to_string())))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_IMPLEMENTED);
        assert!(matches!(
            err,
            EngineError::NotImplemented { ref operation } if operation == "ships.rat.remove"
        ));
    }

    #[tokio::test]
    async fn test_stranger_cannot_change() {
        let engine = Engine::fuelrats().unwrap();
        let changes = ship_changes(Arc::new(InMemoryRelationshipStore::new()));

        let ship = ship();
        let query = owner_of(&["rat-2"], &["ships.write.me"], &engine);
        let view = ResourceView::of_type(engine.context(&query), "ships", &ship).unwrap();

        let err = changes
            .apply(&view, "rat", ChangeOp::Patch, Linkage::One(Some("rat-2".to_string())))
            .await
            .unwrap_err();
        match err {
            EngineError::PermissionDenied { permission, .. } => {
                assert_eq!(permission, "ships.write.me")
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}

mod rescue_rats_tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_remove_rats() {
        let engine = Engine::fuelrats().unwrap();
        let changes = rescue_changes(Arc::new(InMemoryRelationshipStore::new()));

        let rescue = rescue();
        let query = owner_of(&["rat-1"], &["rescues.write.me"], &engine);
        let view = ResourceView::of_type(engine.context(&query), "rescues", &rescue).unwrap();
        let many = |ids: &[&str]| Linkage::Many(ids.iter().map(|id| id.to_string()).collect());

        changes
            .apply(&view, "rats", ChangeOp::Add, many(&["rat-1", "rat-2"]))
            .await
            .unwrap();
        let linkage = changes
            .apply(&view, "rats", ChangeOp::Add, many(&["rat-2", "rat-3"]))
            .await
            .unwrap();
        assert_eq!(linkage.ids(), vec!["rat-1", "rat-2", "rat-3"]);

        let linkage = changes
            .apply(&view, "rats", ChangeOp::Remove, many(&["rat-2"]))
            .await
            .unwrap();
        assert_eq!(linkage.ids(), vec!["rat-1", "rat-3"]);

        let linkage = changes
            .apply(&view, "rats", ChangeOp::Patch, many(&["rat-4"]))
            .await
            .unwrap();
        assert_eq!(
            linkage,
            ResourceLinkage::Many(vec![ResourceIdentifier::new("rats", "rat-4")])
        );
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_bad_request() {
        let engine = Engine::fuelrats().unwrap();
        let changes = rescue_changes(Arc::new(InMemoryRelationshipStore::new()));

        let rescue = rescue();
        let query = owner_of(&[], &["rescues.write"], &engine);
        let view = ResourceView::of_type(engine.context(&query), "rescues", &rescue).unwrap();

        let err = changes
            .apply(&view, "rats", ChangeOp::Patch, Linkage::One(Some("rat-1".to_string())))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::BadRequest { .. }));

        let err = changes
            .apply(&view, "firstLimpet", ChangeOp::Patch, Linkage::Many(Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn test_unknown_relationship() {
        let engine = Engine::fuelrats().unwrap();
        let changes = rescue_changes(Arc::new(InMemoryRelationshipStore::new()));

        let rescue = rescue();
        let query = owner_of(&[], &["rescues.sudo"], &engine);
        let view = ResourceView::of_type(engine.context(&query), "rescues", &rescue).unwrap();

        let err = changes
            .apply(&view, "epics", ChangeOp::Add, Linkage::Many(Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedRelationship { .. }));
    }

    #[tokio::test]
    async fn test_request_body_drives_change() {
        let engine = Engine::fuelrats().unwrap();
        let changes = rescue_changes(Arc::new(InMemoryRelationshipStore::new()));

        let rescue = rescue();
        let query = owner_of(&[], &["rescues.write"], &engine);
        let view = ResourceView::of_type(engine.context(&query), "rescues", &rescue).unwrap();

        let body = json!({ "data": { "type": "rats", "id": "rat-7" } });
        let linkage = Linkage::from_document(&body, "rats").unwrap();
        let result = changes
            .apply(&view, "firstLimpet", ChangeOp::Patch, linkage)
            .await
            .unwrap();

        let document = Document::relationship_linkage(
            engine.context(&query),
            "rescues",
            "r1",
            "firstLimpet",
            result,
        )
        .unwrap();
        let wire = serde_json::to_value(document.render()).unwrap();
        assert_eq!(wire["data"], json!({ "type": "rats", "id": "rat-7" }));

        let bad = json!({ "data": [{ "type": "ships", "id": "s1" }] });
        match Linkage::from_document(&bad, "rats") {
            Err(EngineError::Conflict { pointer }) => assert_eq!(pointer, "/data/0/type"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_change_event_after_render() {
        let engine = Engine::fuelrats().unwrap();
        let mut events = engine.events().subscribe();
        let changes = rescue_changes(Arc::new(InMemoryRelationshipStore::new()));

        let rescue = rescue();
        let query = owner_of(&[], &["rescues.write"], &engine);
        let view = ResourceView::of_type(engine.context(&query), "rescues", &rescue).unwrap();

        let result = changes
            .apply(&view, "rats", ChangeOp::Add, Linkage::Many(vec!["rat-5".to_string()]))
            .await
            .unwrap();
        let document =
            Document::relationship_linkage(engine.context(&query), "rescues", "r1", "rats", result).unwrap();
        assert_eq!(engine.events().notify(ResourceAction::RelationshipChanged, &document), 1);

        let envelope = events.recv().await.unwrap();
        assert_eq!(envelope.event.resource_type, "rescues");
        assert_eq!(envelope.event.action, ResourceAction::RelationshipChanged);
        assert!(envelope.event.resource_id.is_none());
    }
}
