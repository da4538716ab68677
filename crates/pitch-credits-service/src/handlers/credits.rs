//! Credit balance and transaction handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;

use pitch_credits_core::LedgerEntry;
use pitch_credits_ledger::DEFAULT_HISTORY_LIMIT;

use super::PageQuery;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Balance in credits.
    pub balance: i64,
}

/// Get current credit balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.ledger.balance(&auth.user_id)?;

    Ok(Json(BalanceResponse { balance }))
}

/// Ledger entry response.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    /// Entry ID.
    pub id: String,
    /// Position in the user's ledger.
    pub sequence: u64,
    /// Signed change (positive = credit, negative = debit).
    pub delta: i64,
    /// Reason for the change.
    pub reason: String,
    /// Payment method.
    pub method: String,
    /// Free-text note.
    pub note: String,
    /// Balance after this entry.
    pub balance_after: i64,
    /// Staff member responsible, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acting_staff: Option<String>,
    /// Timestamp.
    pub created_at: String,
}

impl From<&LedgerEntry> for EntryResponse {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            sequence: entry.sequence,
            delta: entry.delta,
            reason: entry.reason.as_str().to_string(),
            method: entry.method.as_str().to_string(),
            note: entry.note.clone(),
            balance_after: entry.balance_after,
            acting_staff: entry.acting_staff.map(|id| id.to_string()),
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// List transactions response.
#[derive(Debug, Serialize)]
pub struct ListTransactionsResponse {
    /// Entries (newest first).
    pub transactions: Vec<EntryResponse>,
    /// Whether there are more entries.
    pub has_more: bool,
}

/// List transaction history.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    // Fetch one more than requested to determine has_more
    let limit = query.capped_limit();
    let entries = state
        .ledger
        .transactions_page(&auth.user_id, limit + 1, query.offset)?;

    let has_more = entries.len() > limit;
    let transactions = entries
        .iter()
        .take(limit)
        .map(EntryResponse::from)
        .collect();

    Ok(Json(ListTransactionsResponse {
        transactions,
        has_more,
    }))
}

/// Credits overview response.
#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    /// Balance in credits.
    pub balance: i64,
    /// Most recent entries, newest first.
    pub recent: Vec<EntryResponse>,
}

/// Balance together with the most recent ledger entries.
pub async fn overview(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<OverviewResponse>, ApiError> {
    let balance = state.ledger.balance(&auth.user_id)?;
    let recent = state
        .ledger
        .transactions(&auth.user_id, DEFAULT_HISTORY_LIMIT)?;

    Ok(Json(OverviewResponse {
        balance,
        recent: recent.iter().map(EntryResponse::from).collect(),
    }))
}
