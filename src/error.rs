//! Domain-specific error types for social-leaf

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Main error type for the social-leaf backend
#[derive(Error, Debug)]
pub enum SocialLeafError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Upstream provider error: {message}")]
    Upstream { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Plan restriction: upgrade your plan to access {feature}")]
    PlanRestriction {
        feature: String,
        display_name: String,
        current_plan: String,
        required_plans: Vec<String>,
    },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Invalid parameters: {message}")]
    InvalidParams { message: String },
}

impl From<anyhow::Error> for SocialLeafError {
    fn from(err: anyhow::Error) -> Self {
        SocialLeafError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SocialLeafError {
    fn from(err: serde_json::Error) -> Self {
        SocialLeafError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for SocialLeafError {
    fn from(err: reqwest::Error) -> Self {
        SocialLeafError::Upstream {
            message: format!("HTTP request failed: {}", err),
        }
    }
}

impl From<std::io::Error> for SocialLeafError {
    fn from(err: std::io::Error) -> Self {
        SocialLeafError::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<csv::Error> for SocialLeafError {
    fn from(err: csv::Error) -> Self {
        SocialLeafError::Serialization {
            message: format!("CSV error: {}", err),
        }
    }
}

impl SocialLeafError {
    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            SocialLeafError::Validation { .. } | SocialLeafError::InvalidParams { .. } => {
                StatusCode::BAD_REQUEST
            }
            SocialLeafError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            SocialLeafError::PlanRestriction { .. } => StatusCode::FORBIDDEN,
            SocialLeafError::NotFound { .. } => StatusCode::NOT_FOUND,
            SocialLeafError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            SocialLeafError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            SocialLeafError::Config { .. }
            | SocialLeafError::Store { .. }
            | SocialLeafError::Serialization { .. }
            | SocialLeafError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert SocialLeafError to a JSON error response
impl IntoResponse for SocialLeafError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", self);
        }

        let (label, details) = match self {
            SocialLeafError::PlanRestriction {
                feature,
                display_name,
                current_plan,
                required_plans,
            } => {
                let body = json!({
                    "error": "plan_restriction",
                    "message": format!("Upgrade your plan to access {display_name}"),
                    "feature": feature,
                    "current_plan": current_plan,
                    "required_plans": required_plans,
                });
                return (status, Json(body)).into_response();
            }
            SocialLeafError::Config { message } => ("Configuration error", message),
            SocialLeafError::Store { message } => ("Store error", message),
            SocialLeafError::Upstream { message } => ("Upstream error", message),
            SocialLeafError::Serialization { message } => ("Serialization error", message),
            SocialLeafError::Timeout {
                operation,
                timeout_ms,
            } => (
                "Operation timeout",
                format!("{operation} timed out after {timeout_ms}ms"),
            ),
            SocialLeafError::Validation { message } => ("Validation error", message),
            SocialLeafError::Internal { message } => ("Internal error", message),
            SocialLeafError::Unauthorized { message } => ("Unauthorized", message),
            SocialLeafError::NotFound { message } => ("Not found", message),
            SocialLeafError::InvalidParams { message } => ("Invalid parameters", message),
        };

        let body = json!({
            "error": {
                "code": status.as_u16(),
                "message": format!("{label}: {details}"),
                "details": details,
            }
        });
        (status, Json(body)).into_response()
    }
}

/// Result type alias for social-leaf operations
pub type Result<T> = std::result::Result<T, SocialLeafError>;
