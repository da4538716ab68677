//! Storage layer for the pitch-credits ledger.
//!
//! This crate persists accounts, ledger entries, credit requests and
//! generated proposals. It holds no business rules beyond the integrity
//! checks of [`Store::append_entry`]: the balance and the entry that explains
//! it are always written together, or not at all.
//!
//! Two backends implement [`Store`]:
//!
//! - [`RocksStore`]: `RocksDB` with column families and CBOR values
//!   (feature `rocksdb-backend`). It is a default feature of this crate,
//!   but the ledger and service depend on it with defaults off, so the
//!   service binary only uses `RocksDB` when built with
//!   `--features rocksdb-backend`.
//! - [`MemoryStore`]: in-process maps, for tests and ephemeral deployments.
//!   The service runs on it when built without `RocksDB`.
//!
//! # Example
//!
//! ```
//! use pitch_credits_core::{Account, UserId};
//! use pitch_credits_store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! let user_id = UserId::generate();
//! store.create_account(&Account::new(user_id)).unwrap();
//! assert_eq!(store.get_balance(&user_id).unwrap(), 0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use error::{Entity, Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use pitch_credits_core::{
    Account, CreditRequest, CreditRequestId, EntryId, GeneratedProposal, LedgerEntry, ProposalId,
    RequestStatus, UserId,
};

/// One atomic ledger write: a new entry, the balance it produces, and
/// optionally the credit request it settles.
#[derive(Debug, Clone, Copy)]
pub struct LedgerAppend<'a> {
    /// Balance the writer read before computing the entry.
    pub expected_balance: i64,
    /// The entry to append. Its `balance_after` becomes the stored balance.
    pub entry: &'a LedgerEntry,
    /// A credit request moving out of `pending` in the same write.
    pub resolves: Option<&'a CreditRequest>,
}

impl<'a> LedgerAppend<'a> {
    /// An append that settles no request.
    #[must_use]
    pub const fn new(expected_balance: i64, entry: &'a LedgerEntry) -> Self {
        Self {
            expected_balance,
            entry,
            resolves: None,
        }
    }

    /// Settle `request` in the same write.
    #[must_use]
    pub const fn resolving(mut self, request: &'a CreditRequest) -> Self {
        self.resolves = Some(request);
        self
    }
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (`RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the user already has an account.
    fn create_account(&self, account: &Account) -> Result<()>;

    /// Get an account by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>>;

    /// Get the current balance of a user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn get_balance(&self, user_id: &UserId) -> Result<i64> {
        self.get_account(user_id)?
            .map(|account| account.balance)
            .ok_or_else(|| StoreError::not_found(Entity::Account, user_id))
    }

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    /// Append a ledger entry and update the balance in one atomic write.
    ///
    /// Nothing is written unless the stored balance equals
    /// `expected_balance`, the entry's sequence directly follows the stored
    /// entry count, the entry's snapshot equals `expected_balance + delta`,
    /// and the snapshot is not negative. A request in `resolves` must still
    /// be pending in storage.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account (or resolved request) doesn't exist.
    /// - `StoreError::LedgerConflict` if any integrity check fails.
    /// - `StoreError::InvalidState` if the resolved request is no longer pending.
    fn append_entry(&self, append: &LedgerAppend<'_>) -> Result<EntryId>;

    /// Get a ledger entry by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_entry(&self, entry_id: &EntryId) -> Result<Option<LedgerEntry>>;

    /// List a user's entries, newest first (reverse append order).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_entries(&self, user_id: &UserId, limit: usize, offset: usize)
        -> Result<Vec<LedgerEntry>>;

    // =========================================================================
    // Credit Request Operations
    // =========================================================================

    /// Insert a new credit request.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the ID is taken.
    fn put_credit_request(&self, request: &CreditRequest) -> Result<()>;

    /// Get a credit request by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_credit_request(&self, request_id: &CreditRequestId) -> Result<Option<CreditRequest>>;

    /// List a user's credit requests, newest first, skipping `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_credit_requests_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditRequest>>;

    /// List all pending credit requests, oldest first, skipping `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_pending_credit_requests(&self, limit: usize, offset: usize)
        -> Result<Vec<CreditRequest>>;

    /// Persist a rejected request, provided the stored copy is still pending.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the request doesn't exist.
    /// - `StoreError::InvalidState` if it was already resolved.
    fn reject_credit_request(&self, request: &CreditRequest) -> Result<()>;

    // =========================================================================
    // Proposal Operations
    // =========================================================================

    /// Insert a generated proposal.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_proposal(&self, proposal: &GeneratedProposal) -> Result<()>;

    /// Get a proposal by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_proposal(&self, proposal_id: &ProposalId) -> Result<Option<GeneratedProposal>>;

    /// Delete a proposal.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the proposal doesn't exist.
    fn delete_proposal(&self, proposal_id: &ProposalId) -> Result<()>;

    /// List a user's proposals, newest first, skipping `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_proposals_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<GeneratedProposal>>;
}

/// Validate an append against the stored account and return the account as
/// it must be written.
///
/// Shared by every backend so they enforce identical integrity rules.
pub(crate) fn checked_account_update(
    stored: &Account,
    append: &LedgerAppend<'_>,
) -> Result<Account> {
    let entry = append.entry;
    if entry.user_id != stored.user_id {
        return Err(StoreError::conflict(
            stored.user_id,
            format!("entry belongs to {}", entry.user_id),
        ));
    }
    if stored.balance != append.expected_balance {
        return Err(StoreError::conflict(
            stored.user_id,
            format!(
                "stored balance {} differs from expected {}",
                stored.balance, append.expected_balance
            ),
        ));
    }
    if entry.sequence != stored.next_sequence() {
        return Err(StoreError::conflict(
            stored.user_id,
            format!(
                "entry sequence {} does not follow {}",
                entry.sequence, stored.entry_count
            ),
        ));
    }
    if append.expected_balance + entry.delta != entry.balance_after {
        return Err(StoreError::conflict(
            stored.user_id,
            format!(
                "snapshot {} does not equal {} + {}",
                entry.balance_after, append.expected_balance, entry.delta
            ),
        ));
    }
    if entry.balance_after < 0 {
        return Err(StoreError::conflict(
            stored.user_id,
            format!("snapshot {} is negative", entry.balance_after),
        ));
    }
    Ok(stored.with_delta(entry.delta, entry.created_at))
}

/// Check that `request` may replace `stored`: same request and user, the
/// stored copy is still pending, and the new copy is resolved.
pub(crate) fn check_resolution(stored: &CreditRequest, request: &CreditRequest) -> Result<()> {
    if stored.status != RequestStatus::Pending {
        return Err(StoreError::InvalidState {
            request_id: stored.id.to_string(),
            status: stored.status,
        });
    }
    if !stored.status.can_transition_to(request.status)
        || stored.id != request.id
        || stored.user_id != request.user_id
    {
        return Err(StoreError::conflict(
            stored.user_id,
            format!("request {} does not match stored record", request.id),
        ));
    }
    Ok(())
}
