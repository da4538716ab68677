//! Ledger replay.

use pitch_credits_core::{Actor, CreditsError, Result, UserId};

use crate::Ledger;

/// Page size used when replaying a ledger.
const REPLAY_PAGE: usize = 500;

/// Outcome of replaying one user's ledger.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AuditReport {
    /// The audited user.
    pub user_id: UserId,
    /// Balance stored on the account.
    pub balance: i64,
    /// Sum of all entry deltas, oldest first from zero.
    pub replayed_balance: i64,
    /// Number of entries replayed.
    pub entry_count: u64,
    /// Number of entries the account says it has.
    pub expected_entries: u64,
    /// Sequence of the first entry whose snapshot, or position, is wrong.
    pub first_mismatch: Option<u64>,
}

impl AuditReport {
    /// Whether the stored balance and the ledger agree.
    ///
    /// A ledger missing entries is inconsistent even when the missing
    /// deltas happen to sum to zero.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.balance == self.replayed_balance
            && self.entry_count == self.expected_entries
            && self.first_mismatch.is_none()
    }
}

impl Ledger {
    /// Replay `user_id`'s ledger and compare it with the stored balance.
    ///
    /// Holds the user's lock so no append interleaves with the replay.
    pub fn audit(&self, user_id: &UserId) -> Result<AuditReport> {
        self.locks.with_lock(user_id, || {
            let account = self.load_account(user_id)?;

            // Entries come back newest first; collect and walk them in reverse.
            let mut entries = Vec::new();
            loop {
                let page = self
                    .store
                    .list_entries(user_id, REPLAY_PAGE, entries.len())?;
                let done = page.len() < REPLAY_PAGE;
                entries.extend(page);
                if done {
                    break;
                }
            }

            let mut running = 0_i64;
            let mut first_mismatch = None;
            for (expected_sequence, entry) in (1_u64..).zip(entries.iter().rev()) {
                running += entry.delta;
                if first_mismatch.is_none()
                    && (entry.balance_after != running || entry.sequence != expected_sequence)
                {
                    first_mismatch = Some(expected_sequence);
                }
            }

            let report = AuditReport {
                user_id: *user_id,
                balance: account.balance,
                replayed_balance: running,
                entry_count: entries.len() as u64,
                expected_entries: account.entry_count,
                first_mismatch,
            };

            if report.is_consistent() {
                tracing::debug!(user_id = %user_id, entries = report.entry_count, "Ledger audit passed");
            } else {
                tracing::error!(
                    user_id = %user_id,
                    balance = report.balance,
                    replayed = report.replayed_balance,
                    entries = report.entry_count,
                    expected_entries = report.expected_entries,
                    first_mismatch = ?report.first_mismatch,
                    "Ledger audit failed"
                );
            }
            Ok(report)
        })
    }

    /// [`Ledger::audit`] for staff.
    pub fn audit_as(&self, actor: &Actor, user_id: &UserId) -> Result<AuditReport> {
        if !actor.is_staff() {
            return Err(CreditsError::NotPermitted("only staff may audit ledgers".into()));
        }
        self.audit(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use pitch_credits_core::{Adjustment, EntryReason};
    use pitch_credits_store::MemoryStore;

    #[test]
    fn replay_matches_after_mixed_activity() {
        let ledger = Ledger::new(Arc::new(MemoryStore::new()));
        let user_id = UserId::generate();
        ledger.open_account(user_id).unwrap();

        for delta in [10, -3, 7, -14, 5] {
            let reason = if delta > 0 {
                EntryReason::TopUp
            } else {
                EntryReason::GenerationCharge
            };
            ledger.adjust(Adjustment::new(user_id, delta, reason)).unwrap();
        }
        // refused, must not show up in the replay
        assert!(ledger
            .adjust(Adjustment::new(user_id, -100, EntryReason::GenerationCharge))
            .is_err());

        let report = ledger.audit(&user_id).unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.balance, 5);
        assert_eq!(report.entry_count, 5);
    }

    #[test]
    fn empty_ledger_is_consistent() {
        let ledger = Ledger::new(Arc::new(MemoryStore::new()));
        let user_id = UserId::generate();
        ledger.open_account(user_id).unwrap();

        let report = ledger.audit(&user_id).unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.replayed_balance, 0);
    }

    #[test]
    fn members_cannot_audit() {
        let ledger = Ledger::new(Arc::new(MemoryStore::new()));
        let user_id = UserId::generate();
        ledger.open_account(user_id).unwrap();

        assert!(matches!(
            ledger.audit_as(&Actor::member(user_id), &user_id),
            Err(CreditsError::NotPermitted(_))
        ));
        assert!(ledger
            .audit_as(&Actor::staff(UserId::generate()), &user_id)
            .is_ok());
    }
}
