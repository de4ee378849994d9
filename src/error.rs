use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Ledger invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for VaultError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match &self {
            VaultError::Validation(e) => {
                tracing::warn!("Validation error: {}", e);
                (StatusCode::BAD_REQUEST, "Validation failed", self.to_string())
            }
            VaultError::NotFound(e) => {
                tracing::warn!("Not found: {}", e);
                (StatusCode::NOT_FOUND, "Not found", self.to_string())
            }
            VaultError::Conflict(e) => {
                tracing::warn!("Conflict: {}", e);
                (StatusCode::CONFLICT, "Conflict", self.to_string())
            }
            VaultError::Gateway(e) => {
                tracing::error!("Gateway error: {}", e);
                (StatusCode::BAD_GATEWAY, "Payment gateway error", self.to_string())
            }
            VaultError::InvariantViolation(e) => {
                // upstream data corruption - surfaced, never defaulted to zero
                tracing::error!("Invariant violation: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal ledger error", self.to_string())
            }
            VaultError::Unauthorized(e) => {
                tracing::warn!("Unauthorized: {}", e);
                (StatusCode::UNAUTHORIZED, "Unauthorized", self.to_string())
            }
            VaultError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", self.to_string())
            }
        };

        // the mobile client reads both `error` and `message` depending on the screen
        let body = Json(json!({
            "error": error_message,
            "message": details,
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for VaultError {
    fn from(error: reqwest::Error) -> Self {
        VaultError::Gateway(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
