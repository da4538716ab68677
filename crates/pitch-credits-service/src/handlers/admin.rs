//! Staff handlers: the credit request queue, manual adjustments and audits.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use pitch_credits_core::{
    Adjustment, CreditRequestId, Decision, EntryReason, PaymentMethod, UserId,
};
use pitch_credits_ledger::AuditReport;

use super::credits::EntryResponse;
use super::requests::{CreditRequestResponse, ListCreditRequestsResponse};
use super::PageQuery;
use crate::auth::StaffUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Pending credit requests, oldest first.
pub async fn list_pending_requests(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListCreditRequestsResponse>, ApiError> {
    let requests = state
        .ledger
        .pending_credit_requests(&staff.actor(), query.capped_limit(), query.offset)?;

    Ok(Json(ListCreditRequestsResponse {
        requests: requests.iter().map(CreditRequestResponse::from).collect(),
    }))
}

/// Approve or reject a pending credit request.
///
/// The path is `/admin/credit-requests/:id/:decision` with `decision` one
/// of `approve` or `reject`.
pub async fn resolve_request(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path((request_id, decision)): Path<(String, String)>,
) -> Result<Json<CreditRequestResponse>, ApiError> {
    let request_id: CreditRequestId = request_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid credit request ID".into()))?;
    let decision: Decision = decision.parse().map_err(ApiError::BadRequest)?;

    let request = state
        .ledger
        .resolve_credit_request(&request_id, decision, &staff.actor())?;

    Ok(Json(CreditRequestResponse::from(&request)))
}

/// Manual adjustment body.
#[derive(Debug, Deserialize)]
pub struct AdjustCreditsRequest {
    /// Target user ID.
    pub user_id: String,
    /// Signed change.
    pub delta: i64,
    /// `top_up`, `admin_adjust` or `refund`.
    pub reason: EntryReason,
    /// How the credits were paid for.
    #[serde(default)]
    pub method: PaymentMethod,
    /// Free-text note.
    #[serde(default)]
    pub note: String,
}

/// Manual adjustment response.
#[derive(Debug, Serialize)]
pub struct AdjustCreditsResponse {
    /// The entry written.
    pub entry: EntryResponse,
    /// Balance after the adjustment.
    pub new_balance: i64,
}

/// Adjust a user's balance by hand.
pub async fn adjust_credits(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Json(body): Json<AdjustCreditsRequest>,
) -> Result<Json<AdjustCreditsResponse>, ApiError> {
    let user_id: UserId = body
        .user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    let adjustment = Adjustment::new(user_id, body.delta, body.reason)
        .with_method(body.method)
        .with_note(body.note.trim());

    let entry = state.ledger.staff_adjust(&staff.actor(), adjustment)?;

    Ok(Json(AdjustCreditsResponse {
        new_balance: entry.balance_after,
        entry: EntryResponse::from(&entry),
    }))
}

/// Audit response.
#[derive(Debug, Serialize)]
pub struct AuditResponse {
    /// Replay details.
    #[serde(flatten)]
    pub report: AuditReport,
    /// Whether balance and ledger agree.
    pub consistent: bool,
}

/// Replay a user's ledger against the stored balance.
pub async fn audit_account(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(user_id): Path<String>,
) -> Result<Json<AuditResponse>, ApiError> {
    let user_id: UserId = user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    let report = state.ledger.audit_as(&staff.actor(), &user_id)?;

    Ok(Json(AuditResponse {
        consistent: report.is_consistent(),
        report,
    }))
}
