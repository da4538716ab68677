//! Credit request workflow.
//!
//! Users submit requests; staff approve or reject them. Approval writes
//! exactly one `top_up` entry and settles the request in the same atomic
//! store write. Rejection touches only the request.

use chrono::Utc;

use pitch_credits_core::{
    Actor, Adjustment, CreditRequest, CreditRequestId, CreditsError, Decision, EntryReason,
    PaymentMethod, Result, UserId,
};
use pitch_credits_store::LedgerAppend;

use crate::adjuster::draft_entry;
use crate::Ledger;

impl Ledger {
    /// Record a pending request for `amount` credits.
    pub fn submit_credit_request(
        &self,
        user_id: UserId,
        amount: i64,
        message: impl Into<String>,
    ) -> Result<CreditRequest> {
        if amount <= 0 {
            return Err(CreditsError::InvalidAmount(
                "requested amount must be positive".into(),
            ));
        }
        self.load_account(&user_id)?;

        let request = CreditRequest::new(user_id, amount, message);
        self.store.put_credit_request(&request)?;

        tracing::info!(
            user_id = %user_id,
            request_id = %request.id,
            amount,
            "Credit request submitted"
        );
        Ok(request)
    }

    /// Approve or reject a pending request.
    ///
    /// Runs under the requesting user's lock, so two staff members acting on
    /// the same request cannot both succeed: the second sees a non-pending
    /// request and gets `InvalidRequestState`.
    pub fn resolve_credit_request(
        &self,
        request_id: &CreditRequestId,
        decision: Decision,
        actor: &Actor,
    ) -> Result<CreditRequest> {
        if !actor.is_staff() {
            return Err(CreditsError::NotPermitted(
                "only staff may resolve credit requests".into(),
            ));
        }

        let request = self.load_credit_request(request_id)?;
        let user_id = request.user_id;

        self.locks.with_lock(&user_id, || {
            // Re-read under the lock; the copy above may be stale.
            let request = self.load_credit_request(request_id)?;
            if !request.is_pending() {
                return Err(CreditsError::InvalidRequestState {
                    request_id: request.id.to_string(),
                    status: request.status,
                });
            }

            let resolved = match decision {
                Decision::Approve => self.approve(&request, actor)?,
                Decision::Reject => {
                    let rejected = request
                        .rejected(actor.user_id, Utc::now())
                        .ok_or_else(|| invalid_state(&request))?;
                    self.store.reject_credit_request(&rejected)?;
                    rejected
                }
            };

            tracing::info!(
                request_id = %resolved.id,
                user_id = %user_id,
                staff = %actor.user_id,
                status = %resolved.status,
                "Credit request resolved"
            );
            Ok(resolved)
        })
    }

    /// A user's own requests, newest first.
    pub fn credit_requests_for(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditRequest>> {
        Ok(self
            .store
            .list_credit_requests_by_user(user_id, limit, offset)?)
    }

    /// The staff review queue: pending requests, oldest first.
    pub fn pending_credit_requests(
        &self,
        actor: &Actor,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditRequest>> {
        if !actor.is_staff() {
            return Err(CreditsError::NotPermitted(
                "only staff may review credit requests".into(),
            ));
        }
        Ok(self.store.list_pending_credit_requests(limit, offset)?)
    }

    /// Write the top-up entry and the approved request together.
    fn approve(&self, request: &CreditRequest, actor: &Actor) -> Result<CreditRequest> {
        let account = self.load_account(&request.user_id)?;
        let adjustment = Adjustment::new(request.user_id, request.amount, EntryReason::TopUp)
            .with_method(PaymentMethod::Other)
            .with_note(format!("Approved credit request {}", request.id))
            .by_staff(actor.user_id);
        let entry = draft_entry(&account, adjustment)?;

        let approved = request
            .approved(actor.user_id, entry.id, entry.created_at)
            .ok_or_else(|| invalid_state(request))?;

        self.commit(&LedgerAppend::new(account.balance, &entry).resolving(&approved))?;
        Ok(approved)
    }

    fn load_credit_request(&self, request_id: &CreditRequestId) -> Result<CreditRequest> {
        self.store
            .get_credit_request(request_id)?
            .ok_or_else(|| CreditsError::CreditRequestNotFound {
                request_id: request_id.to_string(),
            })
    }
}

fn invalid_state(request: &CreditRequest) -> CreditsError {
    CreditsError::InvalidRequestState {
        request_id: request.id.to_string(),
        status: request.status,
    }
}
