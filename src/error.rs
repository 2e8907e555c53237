//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Startup errors: resource configuration that cannot be turned into a running admin.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("duplicate resource name: {0}")]
    DuplicateResource(String),
    #[error("duplicate field '{field}' in resource {resource}")]
    DuplicateField { resource: String, field: String },
    #[error("duplicate route: {method} {path}")]
    DuplicateRoute { method: String, path: String },
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Backend failures. Never shown to clients.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("codec: {0}")]
    Codec(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<serde_json::Value>,
    },
    #[error("{0}")]
    Auth(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_with(message: impl Into<String>, details: serde_json::Value) -> Self {
        AppError::Validation {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Same message for malformed and absent identifiers.
    pub fn entity_not_found(id: &str) -> Self {
        AppError::NotFound(format!("Entity with id: {} not found", id))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Config(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Validation { message, details } => ErrorBody {
                error: message,
                error_details: details,
            },
            AppError::Auth(message) | AppError::NotFound(message) => ErrorBody {
                error: message,
                error_details: None,
            },
            other => {
                tracing::error!(error = %other, "unclassified error");
                ErrorBody {
                    error: "Unknown Error".into(),
                    error_details: None,
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_error_carries_details() {
        let err = AppError::validation_with("bad", serde_json::json!({"age": "value is not an integer"}));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "bad");
        assert_eq!(body["error_details"]["age"], "value is not an integer");
    }

    #[tokio::test]
    async fn store_error_does_not_leak() {
        let err = AppError::Store(StoreError::Codec("relation \"admin.secret\" missing".into()));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body, serde_json::json!({"error": "Unknown Error"}));
    }

    #[tokio::test]
    async fn not_found_has_no_details_key() {
        let resp = AppError::entity_not_found("abc").into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "Entity with id: abc not found");
        assert!(body.get("error_details").is_none());
    }
}
