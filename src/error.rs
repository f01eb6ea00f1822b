use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::language::LanguageError;

/// Errors a request handler can end with. Each maps to one HTTP status.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    /// The Natural Language API failed; not retried.
    #[error("text analysis failed: {0}")]
    Analysis(#[from] LanguageError),
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl AppError {
    pub fn missing_field(name: &str) -> Self {
        AppError::BadRequest(format!("missing required field '{name}'"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Analysis(_) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Storage(e) => {
                error!("Storage error: {:?}", e);
                "Failed to access song storage.".to_string()
            }
            AppError::Analysis(e) => {
                error!("Natural Language API error: {}", e);
                self.to_string()
            }
            AppError::BadRequest(_) | AppError::NotFound(_) => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::missing_field("lyrics").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::NotFound("no song".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Analysis(LanguageError::Api {
                status: 403,
                message: "PERMISSION_DENIED".into()
            })
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Storage(sqlx::Error::PoolTimedOut).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_missing_field_message() {
        assert_eq!(
            AppError::missing_field("lyrics").to_string(),
            "missing required field 'lyrics'"
        );
    }
}
