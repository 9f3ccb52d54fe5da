use crate::error::AppError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::{debug, error};

impl AppError {
    /// Message safe to show to API callers
    fn public_message(&self) -> String {
        if self.is_connection_error() {
            return "Service temporarily unavailable".to_string();
        }

        match self {
            AppError::Database(_)
            | AppError::Sqlx(_)
            | AppError::Config(_)
            | AppError::Serialization(_)
            | AppError::Message(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Renders as `{"error": {"code": ..., "message": ...}}`
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            debug!("Request rejected: {}", self);
        }

        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.public_message(),
            }
        });

        (status, Json(body)).into_response()
    }
}
