use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::reference::ReferenceError;
use crate::session::SessionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Only configuration problems end up here. Anything that goes wrong while
/// answering a query is already a refusal inside the `Answer`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ReferenceError> for AppError {
    fn from(e: ReferenceError) -> Self {
        match e {
            ReferenceError::InvalidCity { .. } => AppError::Validation(e.to_string()),
            ReferenceError::NotFound { .. } => AppError::NotFound(e.to_string()),
            ReferenceError::EmptyDocument { .. } => AppError::UnprocessableEntity(e.to_string()),
            ReferenceError::Io { .. } => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotInitialized | SessionError::NoCitySelected => {
                AppError::Conflict(e.to_string())
            }
            SessionError::UnknownSession(_) => AppError::NotFound(e.to_string()),
            SessionError::Reference(inner) => inner.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::City;

    #[test]
    fn test_reference_errors_map_to_client_statuses() {
        let cases = [
            (
                ReferenceError::InvalidCity {
                    requested: "Chennai".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                ReferenceError::NotFound {
                    city: City::Madurai,
                    locator: "context/madurai_context.md".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ReferenceError::EmptyDocument {
                    city: City::Dindigul,
                    locator: "context/dindigul_context.md".to_string(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(AppError::from(error).into_response().status(), status);
        }
    }

    #[test]
    fn test_session_errors_map_to_conflict_and_not_found() {
        let response = AppError::from(SessionError::NoCitySelected).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = AppError::from(SessionError::UnknownSession(uuid::Uuid::nil())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
