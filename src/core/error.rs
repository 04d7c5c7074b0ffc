//! Typed errors raised by the document engine
//!
//! Every failure the engine can report is an [`EngineError`]. The engine never
//! picks a transport status itself; collaborators either call
//! [`EngineError::status_code`] or return the error straight from an axum
//! handler, in which case it is rendered as a JSON:API error document.
//!
//! # Example
//!
//! ```rust,ignore
//! use fuelrats::prelude::*;
//!
//! match Document::individual(ctx, "rescues", None) {
//!     Ok(document) => println!("{}", document.to_wire_string()?),
//!     Err(EngineError::UnsupportedRelationship { relationship, .. }) => {
//!         eprintln!("no such relationship: {}", relationship);
//!     }
//!     Err(e) => eprintln!("{} ({})", e, e.status_code()),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::WireDocument;

/// Result alias used throughout the engine
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// The error type of the document engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The requested entity does not exist
    #[error("{resource_type} not found (parameter '{parameter}')")]
    NotFound {
        resource_type: String,
        parameter: String,
    },

    /// A relationship or uniqueness constraint was violated
    #[error("Conflict at '{pointer}'")]
    Conflict { pointer: String },

    /// The relationship name is unknown for the resource type
    #[error("Relationship '{relationship}' is not supported by {resource_type}")]
    UnsupportedRelationship {
        resource_type: String,
        relationship: String,
    },

    /// A tier or self check failed
    #[error("Permission '{permission}' is required")]
    PermissionDenied {
        permission: String,
        pointer: Option<String>,
    },

    /// An operation the resource type does not provide was invoked
    #[error("{operation} requires an implementation")]
    NotImplemented { operation: String },

    /// The request carried malformed query parameters or linkage
    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        pointer: Option<String>,
    },

    /// Invalid descriptor configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The injected persistence layer failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Should not happen in normal operation
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Shorthand for a missing entity looked up by `id`
    pub fn not_found(resource_type: impl Into<String>) -> Self {
        EngineError::NotFound {
            resource_type: resource_type.into(),
            parameter: "id".to_string(),
        }
    }

    /// Shorthand for a denied permission at a JSON pointer
    pub fn denied(permission: impl Into<String>, pointer: impl Into<String>) -> Self {
        EngineError::PermissionDenied {
            permission: permission.into(),
            pointer: Some(pointer.into()),
        }
    }

    /// Get the HTTP status code a collaborator should use for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
            EngineError::Conflict { .. } => StatusCode::CONFLICT,
            EngineError::UnsupportedRelationship { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            EngineError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            EngineError::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            EngineError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            EngineError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::NotFound { .. } => "not_found",
            EngineError::Conflict { .. } => "conflict",
            EngineError::UnsupportedRelationship { .. } => "unsupported_relationship",
            EngineError::PermissionDenied { .. } => "forbidden",
            EngineError::NotImplemented { .. } => "not_implemented",
            EngineError::BadRequest { .. } => "bad_request",
            EngineError::Config(_) => "config_error",
            EngineError::Storage(_) => "storage_error",
            EngineError::Internal(_) => "internal_error",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            EngineError::NotFound { .. } => "Not Found",
            EngineError::Conflict { .. } => "Conflict",
            EngineError::UnsupportedRelationship { .. } => "Unsupported Relationship",
            EngineError::PermissionDenied { .. } => "Forbidden",
            EngineError::NotImplemented { .. } => "Not Implemented",
            EngineError::BadRequest { .. } => "Bad Request",
            EngineError::Config(_) | EngineError::Storage(_) | EngineError::Internal(_) => {
                "Internal Server Error"
            }
        }
    }

    fn error_source(&self) -> Option<ErrorSource> {
        match self {
            EngineError::NotFound { parameter, .. } => Some(ErrorSource::parameter(parameter)),
            EngineError::Conflict { pointer } => Some(ErrorSource::pointer(pointer)),
            EngineError::UnsupportedRelationship { .. } => {
                Some(ErrorSource::pointer("/relationships"))
            }
            EngineError::PermissionDenied { pointer, .. }
            | EngineError::BadRequest { pointer, .. } => {
                pointer.as_deref().map(ErrorSource::pointer)
            }
            _ => None,
        }
    }

    /// Convert to a JSON:API error object
    ///
    /// Each call mints a fresh error id; documents convert once at
    /// construction so repeated renders stay identical.
    pub fn to_error_object(&self) -> ErrorObject {
        ErrorObject {
            id: Uuid::new_v4(),
            code: self.error_code().to_string(),
            status: self.status_code().as_u16().to_string(),
            title: self.title().to_string(),
            detail: self.to_string(),
            source: self.error_source(),
        }
    }
}

/// A JSON:API error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub id: Uuid,
    pub code: String,
    pub status: String,
    pub title: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
}

/// Where in the request an error originated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

impl ErrorSource {
    pub fn pointer(pointer: impl Into<String>) -> Self {
        Self {
            pointer: Some(pointer.into()),
            parameter: None,
        }
    }

    pub fn parameter(parameter: impl Into<String>) -> Self {
        Self {
            pointer: None,
            parameter: Some(parameter.into()),
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(WireDocument::from_errors(vec![self.to_error_object()]));
        (status, body).into_response()
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Internal(format!("JSON serialization failed: {}", err))
    }
}

impl From<serde_yaml::Error> for EngineError {
    fn from(err: serde_yaml::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404_with_parameter_source() {
        let err = EngineError::not_found("rescues");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let object = err.to_error_object();
        assert_eq!(object.status, "404");
        assert_eq!(object.code, "not_found");
        assert_eq!(
            object.source,
            Some(ErrorSource::parameter("id".to_string()))
        );
    }

    #[test]
    fn test_permission_denied_carries_pointer() {
        let err = EngineError::denied("rescues.write", "/data/attributes/title");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        let object = err.to_error_object();
        assert_eq!(
            object.source.and_then(|s| s.pointer).as_deref(),
            Some("/data/attributes/title")
        );
    }

    #[test]
    fn test_unsupported_relationship_points_at_relationships() {
        let err = EngineError::UnsupportedRelationship {
            resource_type: "ships".to_string(),
            relationship: "epics".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(err.to_string().contains("epics"));
        assert_eq!(
            err.to_error_object().source,
            Some(ErrorSource::pointer("/relationships"))
        );
    }

    #[test]
    fn test_not_implemented_is_501() {
        let err = EngineError::NotImplemented {
            operation: "ships.rat.remove".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(err.error_code(), "not_implemented");
    }

    #[test]
    fn test_internal_errors_have_no_source() {
        let err = EngineError::Storage("connection reset".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_error_object().source.is_none());
    }

    #[test]
    fn test_error_object_serialization_skips_empty_source() {
        let object = EngineError::Internal("boom".to_string()).to_error_object();
        let json = serde_json::to_value(&object).unwrap();
        assert!(json.get("source").is_none());
        assert_eq!(json["title"], "Internal Server Error");
    }

    #[test]
    fn test_into_response_uses_status_code() {
        let response = EngineError::Conflict {
            pointer: "/data/attributes/nick".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
