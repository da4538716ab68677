//! Account types.
//!
//! An account holds the credit balance of exactly one user. The balance is
//! never written directly; it only moves through ledger entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// The credit account of a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The owning user.
    pub user_id: UserId,

    /// Current credit balance. Never negative.
    pub balance: i64,

    /// Number of ledger entries recorded for this user.
    ///
    /// The next entry takes `entry_count + 1` as its sequence number.
    pub entry_count: u64,

    /// Lifetime credits added (sum of positive deltas).
    pub lifetime_credited: i64,

    /// Lifetime credits removed (sum of negative deltas, as a positive number).
    pub lifetime_debited: i64,

    /// When the account was opened.
    pub created_at: DateTime<Utc>,

    /// When the balance last changed.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Open a new account with zero balance.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            balance: 0,
            entry_count: 0,
            lifetime_credited: 0,
            lifetime_debited: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the account can cover a charge of `amount` credits.
    #[must_use]
    pub fn has_sufficient_credits(&self, amount: i64) -> bool {
        self.balance >= amount
    }

    /// Sequence number the next ledger entry must carry.
    #[must_use]
    pub const fn next_sequence(&self) -> u64 {
        self.entry_count + 1
    }

    /// Return a copy of this account with `delta` applied.
    ///
    /// The caller is responsible for checking the balance floor first.
    #[must_use]
    pub fn with_delta(&self, delta: i64, at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.balance += delta;
        next.entry_count += 1;
        if delta > 0 {
            next.lifetime_credited += delta;
        } else {
            next.lifetime_debited += delta.abs();
        }
        next.updated_at = at;
        next
    }
}

/// Role of whoever is acting on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A regular end user.
    Member,
    /// Staff allowed to approve requests and adjust balances.
    Staff,
}

/// The identity performing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// The acting user.
    pub user_id: UserId,
    /// Their role.
    pub role: Role,
}

impl Actor {
    /// An actor with regular member privileges.
    #[must_use]
    pub const fn member(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Member,
        }
    }

    /// An actor with staff privileges.
    #[must_use]
    pub const fn staff(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Staff,
        }
    }

    /// Whether this actor may perform privileged ledger actions.
    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account_has_zero_balance() {
        let account = Account::new(UserId::generate());
        assert_eq!(account.balance, 0);
        assert_eq!(account.entry_count, 0);
        assert_eq!(account.next_sequence(), 1);
    }

    #[test]
    fn account_sufficient_credits() {
        let mut account = Account::new(UserId::generate());
        account.balance = 10;

        assert!(account.has_sufficient_credits(5));
        assert!(account.has_sufficient_credits(10));
        assert!(!account.has_sufficient_credits(11));
    }

    #[test]
    fn with_delta_tracks_lifetime_totals() {
        let account = Account::new(UserId::generate());
        let now = Utc::now();

        let credited = account.with_delta(100, now);
        let debited = credited.with_delta(-30, now);

        assert_eq!(debited.balance, 70);
        assert_eq!(debited.entry_count, 2);
        assert_eq!(debited.lifetime_credited, 100);
        assert_eq!(debited.lifetime_debited, 30);
        // the original is left untouched
        assert_eq!(account.balance, 0);
    }

    #[test]
    fn only_staff_actors_are_privileged() {
        let user = UserId::generate();
        assert!(Actor::staff(user).is_staff());
        assert!(!Actor::member(user).is_staff());
    }
}
