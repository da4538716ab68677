//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use pitch_credits_core::CreditsError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid identity.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - identified caller without the required role.
    #[error("forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - resource already exists or invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Insufficient credits.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error. Nothing was charged; safe to retry.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::InsufficientCredits { balance, required } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                format!(
                    "Not enough credits: {required} needed, {balance} available. \
                     Top up to continue."
                ),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                Some(serde_json::json!({ "retryable": true })),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<CreditsError> for ApiError {
    fn from(err: CreditsError) -> Self {
        match err {
            CreditsError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            CreditsError::InvalidRequestState { .. } | CreditsError::AccountAlreadyExists { .. } => {
                Self::Conflict(err.to_string())
            }
            CreditsError::ExternalOperation { .. } => Self::ExternalService(err.to_string()),
            CreditsError::AccountNotFound { .. } => Self::NotFound("Account not found".into()),
            CreditsError::CreditRequestNotFound { .. } | CreditsError::ProposalNotFound { .. } => {
                Self::NotFound(err.to_string())
            }
            CreditsError::InvalidAmount(msg) => Self::BadRequest(msg),
            CreditsError::InvalidId(e) => Self::BadRequest(e.to_string()),
            CreditsError::NotPermitted(_) => Self::Forbidden,
            CreditsError::LedgerConsistency { .. }
            | CreditsError::Storage(_)
            | CreditsError::Serialization(_) => Self::Internal(err.to_string()),
        }
    }
}
