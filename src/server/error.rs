//! Error → HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::{AppError, ErrorCategory};

impl AppError {
    /// HTTP status for this error.
    pub fn http_status(&self) -> StatusCode {
        match self.category() {
            ErrorCategory::Validation | ErrorCategory::Conflict => StatusCode::BAD_REQUEST,
            ErrorCategory::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::Upstream => StatusCode::BAD_GATEWAY,
            ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = match &self {
            AppError::Undelivered { attempts } => json!({
                "error": self.to_string(),
                "details": format!("{attempts} attempts failed"),
            }),
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                log::error!("Request failed: {self}");
                json!({ "error": "Internal server error", "details": self.to_string() })
            }
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::validation("x").http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::conflict("x").http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::not_found("x").http_status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::upstream("x").http_status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            AppError::Undelivered { attempts: 2 }.http_status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::internal("x").http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
