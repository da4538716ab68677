//! The balance adjuster and read-only account views.

use chrono::Utc;

use pitch_credits_core::{
    Account, Actor, Adjustment, CreditsError, LedgerEntry, Result, UserId,
};
use pitch_credits_store::LedgerAppend;

use crate::Ledger;

impl Ledger {
    /// Open a zero-balance account for a newly created user profile.
    ///
    /// Runs under the user's lock: a backend whose existence check and
    /// insert are separate steps must not overwrite an account that an
    /// append has already moved past zero.
    pub fn open_account(&self, user_id: UserId) -> Result<Account> {
        self.locks.with_lock(&user_id, || {
            let account = Account::new(user_id);
            self.store.create_account(&account)?;
            tracing::info!(user_id = %user_id, "Credit account opened");
            Ok(account)
        })
    }

    /// Apply a signed balance change and record it in the ledger.
    ///
    /// Returns the new balance. Fails with `InsufficientCredits` when the
    /// change would leave the balance below zero, in which case neither the
    /// balance nor the ledger changes.
    pub fn adjust(&self, adjustment: Adjustment) -> Result<i64> {
        self.adjust_entry(adjustment).map(|entry| entry.balance_after)
    }

    /// Like [`Ledger::adjust`], but returns the entry that was written.
    pub fn adjust_entry(&self, adjustment: Adjustment) -> Result<LedgerEntry> {
        if adjustment.delta == 0 {
            return Err(CreditsError::InvalidAmount(
                "adjustment delta must not be zero".into(),
            ));
        }

        let user_id = adjustment.user_id;
        self.locks.with_lock(&user_id, || {
            let account = self.load_account(&user_id)?;
            let entry = draft_entry(&account, adjustment)?;
            self.commit(&LedgerAppend::new(account.balance, &entry))?;
            Ok(entry)
        })
    }

    /// A manual adjustment made by staff.
    ///
    /// Only staff may call this, and only with a reason staff may select
    /// (`top_up`, `admin_adjust` or `refund`). The actor is recorded on the
    /// entry.
    pub fn staff_adjust(&self, actor: &Actor, adjustment: Adjustment) -> Result<LedgerEntry> {
        if !actor.is_staff() {
            return Err(CreditsError::NotPermitted(
                "only staff may adjust balances".into(),
            ));
        }
        if !adjustment.reason.is_staff_selectable() {
            return Err(CreditsError::InvalidAmount(format!(
                "reason {} cannot be used for manual adjustments",
                adjustment.reason.as_str()
            )));
        }

        let entry = self.adjust_entry(adjustment.by_staff(actor.user_id))?;
        tracing::info!(
            staff = %actor.user_id,
            user_id = %entry.user_id,
            delta = entry.delta,
            reason = entry.reason.as_str(),
            new_balance = entry.balance_after,
            "Staff adjusted credits"
        );
        Ok(entry)
    }

    /// The account of a user.
    pub fn account(&self, user_id: &UserId) -> Result<Account> {
        self.load_account(user_id)
    }

    /// Current balance of a user.
    pub fn balance(&self, user_id: &UserId) -> Result<i64> {
        Ok(self.store.get_balance(user_id)?)
    }

    /// The user's most recent `limit` ledger entries, newest first.
    pub fn transactions(&self, user_id: &UserId, limit: usize) -> Result<Vec<LedgerEntry>> {
        self.transactions_page(user_id, limit, 0)
    }

    /// A page of the user's ledger entries, newest first.
    pub fn transactions_page(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        self.load_account(user_id)?;
        Ok(self.store.list_entries(user_id, limit, offset)?)
    }

    pub(crate) fn load_account(&self, user_id: &UserId) -> Result<Account> {
        self.store
            .get_account(user_id)?
            .ok_or_else(|| CreditsError::AccountNotFound {
                user_id: user_id.to_string(),
            })
    }

    /// Persist an append. Must be called with the user's lock held.
    pub(crate) fn commit(&self, append: &LedgerAppend<'_>) -> Result<()> {
        let entry = append.entry;
        match self.store.append_entry(append) {
            Ok(_) => {
                tracing::info!(
                    user_id = %entry.user_id,
                    entry_id = %entry.id,
                    sequence = entry.sequence,
                    delta = entry.delta,
                    reason = entry.reason.as_str(),
                    new_balance = entry.balance_after,
                    "Ledger entry appended"
                );
                Ok(())
            }
            Err(err) => {
                let err = CreditsError::from(err);
                if let CreditsError::LedgerConsistency { user_id, detail } = &err {
                    tracing::error!(
                        user_id = %user_id,
                        detail = %detail,
                        "Ledger consistency violated, append aborted"
                    );
                }
                Err(err)
            }
        }
    }
}

/// Turn an adjustment into the entry that would follow `account`, enforcing
/// the zero floor.
pub(crate) fn draft_entry(account: &Account, adjustment: Adjustment) -> Result<LedgerEntry> {
    let balance_after = account
        .balance
        .checked_add(adjustment.delta)
        .ok_or_else(|| CreditsError::InvalidAmount("balance would overflow".into()))?;

    if balance_after < 0 {
        tracing::warn!(
            user_id = %account.user_id,
            balance = account.balance,
            delta = adjustment.delta,
            "Adjustment refused: insufficient credits"
        );
        return Err(CreditsError::InsufficientCredits {
            balance: account.balance,
            required: -adjustment.delta,
        });
    }

    Ok(adjustment.into_entry(account.next_sequence(), balance_after, Utc::now()))
}
