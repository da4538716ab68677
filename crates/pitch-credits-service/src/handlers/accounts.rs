//! Account handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use pitch_credits_core::Account;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// User ID.
    pub user_id: String,
    /// Current balance in credits.
    pub balance: i64,
    /// Number of ledger entries.
    pub entry_count: u64,
    /// Credits ever added.
    pub lifetime_credited: i64,
    /// Credits ever removed.
    pub lifetime_debited: i64,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            user_id: account.user_id.to_string(),
            balance: account.balance,
            entry_count: account.entry_count,
            lifetime_credited: account.lifetime_credited,
            lifetime_debited: account.lifetime_debited,
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// Open the caller's credit account with a zero balance.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.ledger.open_account(auth.user_id)?;

    Ok(Json(AccountResponse::from(&account)))
}

/// Get the caller's account.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.ledger.account(&auth.user_id)?;

    Ok(Json(AccountResponse::from(&account)))
}
