//! Credit request handlers for end users.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use pitch_credits_core::CreditRequest;

use super::PageQuery;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Longest message accepted with a request.
const MAX_MESSAGE_CHARS: usize = 1000;

/// Credit request response.
#[derive(Debug, Serialize)]
pub struct CreditRequestResponse {
    /// Request ID.
    pub id: String,
    /// Requesting user.
    pub user_id: String,
    /// Credits requested.
    pub amount: i64,
    /// Note for staff.
    pub message: String,
    /// `pending`, `approved` or `rejected`.
    pub status: String,
    /// Submission timestamp.
    pub created_at: String,
    /// Resolution timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
    /// Staff member who resolved the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    /// Top-up entry written on approval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_entry_id: Option<String>,
}

impl From<&CreditRequest> for CreditRequestResponse {
    fn from(request: &CreditRequest) -> Self {
        Self {
            id: request.id.to_string(),
            user_id: request.user_id.to_string(),
            amount: request.amount,
            message: request.message.clone(),
            status: request.status.as_str().to_string(),
            created_at: request.created_at.to_rfc3339(),
            resolved_at: request.resolved_at.map(|at| at.to_rfc3339()),
            resolved_by: request.resolved_by.map(|id| id.to_string()),
            ledger_entry_id: request.ledger_entry_id.map(|id| id.to_string()),
        }
    }
}

/// Submit credit request body.
#[derive(Debug, Deserialize)]
pub struct SubmitCreditRequest {
    /// Credits requested.
    pub amount: i64,
    /// Optional note for staff.
    #[serde(default)]
    pub message: String,
}

/// Ask staff for a credit top-up.
pub async fn submit_request(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<SubmitCreditRequest>,
) -> Result<(StatusCode, Json<CreditRequestResponse>), ApiError> {
    let message = body.message.trim();
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "message must be at most {MAX_MESSAGE_CHARS} characters"
        )));
    }

    let request = state
        .ledger
        .submit_credit_request(auth.user_id, body.amount, message)?;

    Ok((
        StatusCode::CREATED,
        Json(CreditRequestResponse::from(&request)),
    ))
}

/// List credit requests response.
#[derive(Debug, Serialize)]
pub struct ListCreditRequestsResponse {
    /// Requests.
    pub requests: Vec<CreditRequestResponse>,
}

/// List the caller's own requests, newest first.
pub async fn list_my_requests(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListCreditRequestsResponse>, ApiError> {
    let requests = state
        .ledger
        .credit_requests_for(&auth.user_id, query.capped_limit(), query.offset)?;

    Ok(Json(ListCreditRequestsResponse {
        requests: requests.iter().map(CreditRequestResponse::from).collect(),
    }))
}
