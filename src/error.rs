// src/error.rs

//! Unified error handling for RHACbot.

use std::fmt;

use thiserror::Error;

/// Result type alias for RHACbot operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad input shape or range
    #[error("{0}")]
    Validation(String),

    /// Duplicate registration
    #[error("{0}")]
    Conflict(String),

    /// Selection resolved to nothing deliverable
    #[error("{0}")]
    NotFound(String),

    /// Missing or wrong admin password
    #[error("Unauthorized")]
    Unauthorized,

    /// External gateway or storage failure
    #[error("{0}")]
    Upstream(String),

    /// A single gateway call failed
    #[error("Gateway error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Gateway {
        status: Option<u16>,
        message: String,
    },

    /// Every delivery attempt of a broadcast failed
    #[error("No messages were sent")]
    Undelivered { attempts: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// SQLite operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Coarse error taxonomy shared by the services and the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    NotFound,
    Unauthorized,
    Upstream,
    Internal,
}

impl AppError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an upstream error.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    /// Create a gateway error for one outbound call.
    pub fn gateway(status: Option<u16>, message: impl fmt::Display) -> Self {
        Self::Gateway {
            status,
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl fmt::Display) -> Self {
        Self::Internal(message.to_string())
    }

    /// Which bucket of the taxonomy this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Conflict(_) => ErrorCategory::Conflict,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::Unauthorized => ErrorCategory::Unauthorized,
            Self::Upstream(_)
            | Self::Gateway { .. }
            | Self::Undelivered { .. }
            | Self::Http(_)
            | Self::Database(_) => ErrorCategory::Upstream,
            Self::Config(_)
            | Self::Internal(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Toml(_) => ErrorCategory::Internal,
        }
    }

    /// Error text suitable for a per-destination failure entry.
    ///
    /// Gateway failures carry the upstream response text verbatim.
    pub fn detail(&self) -> String {
        match self {
            Self::Gateway { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Upstream HTTP status, when the failure came with one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Gateway { status, .. } => *status,
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_buckets() {
        assert_eq!(
            AppError::validation("bad").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            AppError::gateway(Some(500), "boom").category(),
            ErrorCategory::Upstream
        );
        assert_eq!(
            AppError::Undelivered { attempts: 3 }.category(),
            ErrorCategory::Upstream
        );
        assert_eq!(AppError::config("x").category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_gateway_detail_is_upstream_text() {
        let err = AppError::gateway(Some(403), "{\"meta\":{\"code\":403}}");
        assert_eq!(err.detail(), "{\"meta\":{\"code\":403}}");
        assert_eq!(err.status_code(), Some(403));
        assert_eq!(
            err.to_string(),
            "Gateway error (403): {\"meta\":{\"code\":403}}"
        );
    }

    #[test]
    fn test_gateway_display_without_status() {
        let err = AppError::gateway(None, "connection reset");
        assert_eq!(err.to_string(), "Gateway error: connection reset");
    }
}
