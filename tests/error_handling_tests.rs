//! Tests for the typed error handling system
//!
//! These tests verify that:
//! - Errors return correct HTTP status codes
//! - Error responses are JSON:API error documents
//! - Error conversions work correctly

use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use fuelrats::prelude::*;

// =============================================================================
// HTTP Status Code Tests
// =============================================================================

mod status_code_tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (EngineError::not_found("rescues"), StatusCode::NOT_FOUND),
            (
                EngineError::Conflict {
                    pointer: "/data/type".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                EngineError::UnsupportedRelationship {
                    resource_type: "rescues".to_string(),
                    relationship: "crew".to_string(),
                },
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (
                EngineError::denied("rescues.write", "/data/attributes/notes"),
                StatusCode::FORBIDDEN,
            ),
            (
                EngineError::NotImplemented {
                    operation: "ships.rat.remove".to_string(),
                },
                StatusCode::NOT_IMPLEMENTED,
            ),
            (
                EngineError::BadRequest {
                    message: "filter must be a JSON object".to_string(),
                    pointer: None,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                EngineError::Storage("lock poisoned".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.status_code(), status, "{}", error);
            assert_eq!(error.to_error_object().status, status.as_u16().to_string());
        }
    }
}

// =============================================================================
// Error Object Tests
// =============================================================================

mod error_object_tests {
    use super::*;

    #[test]
    fn test_denied_error_object() {
        let object = EngineError::denied("rescues.sudo", "/data/attributes/title").to_error_object();
        assert_eq!(object.code, "forbidden");
        assert_eq!(object.title, "Forbidden");
        assert!(object.detail.contains("rescues.sudo"));
        assert_eq!(
            object.source.unwrap().pointer.as_deref(),
            Some("/data/attributes/title")
        );
    }

    #[test]
    fn test_error_ids_are_unique() {
        let error = EngineError::not_found("rats");
        assert_ne!(error.to_error_object().id, error.to_error_object().id);
    }

    #[test]
    fn test_json_error_converts_to_internal() {
        let parsed: std::result::Result<Value, _> = serde_json::from_str("{");
        let error: EngineError = parsed.unwrap_err().into();
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_engine_error_into_anyhow() {
        fn load() -> Result<()> {
            let registered: EngineResult<()> = Err(EngineError::Config("duplicate type".to_string()));
            registered?;
            Ok(())
        }
        let error = load().unwrap_err();
        assert!(error.downcast_ref::<EngineError>().is_some());
    }
}

// =============================================================================
// Response Tests
// =============================================================================

mod response_tests {
    use super::*;

    #[tokio::test]
    async fn test_into_response_renders_error_document() {
        let response = EngineError::not_found("rescues").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let document: WireDocument = serde_json::from_slice(&body).unwrap();

        assert!(document.data.is_none());
        let errors = document.errors.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].status, "404");
        assert_eq!(document.jsonapi.version, "1.0");
    }
}
