//! In-memory storage implementation.
//!
//! All state sits behind one `RwLock`, so every write, including the
//! multi-record ones, is atomic with respect to readers.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use pitch_credits_core::{
    Account, CreditRequest, CreditRequestId, EntryId, GeneratedProposal, LedgerEntry, ProposalId,
    UserId,
};

use crate::error::{Entity, Result, StoreError};
use crate::{check_resolution, checked_account_update, LedgerAppend, Store};

#[derive(Default)]
struct Inner {
    accounts: HashMap<UserId, Account>,
    entries: HashMap<EntryId, LedgerEntry>,
    /// Entry IDs per user, in append order.
    entries_by_user: HashMap<UserId, Vec<EntryId>>,
    credit_requests: BTreeMap<CreditRequestId, CreditRequest>,
    pending: BTreeSet<CreditRequestId>,
    proposals: BTreeMap<ProposalId, GeneratedProposal>,
}

/// Storage kept entirely in process memory.
///
/// Used by tests and by builds without the `RocksDB` backend. Contents are
/// lost when the store is dropped.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-applied write: every
    // mutation validates first and then only inserts.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn create_account(&self, account: &Account) -> Result<()> {
        let mut inner = self.write();
        if inner.accounts.contains_key(&account.user_id) {
            return Err(StoreError::AlreadyExists {
                entity: Entity::Account,
                id: account.user_id.to_string(),
            });
        }
        inner.accounts.insert(account.user_id, account.clone());
        Ok(())
    }

    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        Ok(self.read().accounts.get(user_id).cloned())
    }

    fn append_entry(&self, append: &LedgerAppend<'_>) -> Result<EntryId> {
        let entry = append.entry;
        let mut inner = self.write();

        let stored = inner
            .accounts
            .get(&entry.user_id)
            .ok_or_else(|| StoreError::not_found(Entity::Account, entry.user_id))?;
        let account = checked_account_update(stored, append)?;

        if let Some(request) = append.resolves {
            let stored_request = inner
                .credit_requests
                .get(&request.id)
                .ok_or_else(|| StoreError::not_found(Entity::CreditRequest, request.id))?;
            check_resolution(stored_request, request)?;
            if request.user_id != entry.user_id {
                return Err(StoreError::conflict(
                    entry.user_id,
                    format!("request {} belongs to another user", request.id),
                ));
            }
            inner.credit_requests.insert(request.id, request.clone());
            inner.pending.remove(&request.id);
        }

        inner.accounts.insert(entry.user_id, account);
        inner.entries.insert(entry.id, entry.clone());
        inner
            .entries_by_user
            .entry(entry.user_id)
            .or_default()
            .push(entry.id);

        Ok(entry.id)
    }

    fn get_entry(&self, entry_id: &EntryId) -> Result<Option<LedgerEntry>> {
        Ok(self.read().entries.get(entry_id).cloned())
    }

    fn list_entries(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let inner = self.read();
        let Some(ids) = inner.entries_by_user.get(user_id) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .filter_map(|id| inner.entries.get(id).cloned())
            .collect())
    }

    fn put_credit_request(&self, request: &CreditRequest) -> Result<()> {
        let mut inner = self.write();
        if inner.credit_requests.contains_key(&request.id) {
            return Err(StoreError::AlreadyExists {
                entity: Entity::CreditRequest,
                id: request.id.to_string(),
            });
        }
        if request.is_pending() {
            inner.pending.insert(request.id);
        }
        inner.credit_requests.insert(request.id, request.clone());
        Ok(())
    }

    fn get_credit_request(&self, request_id: &CreditRequestId) -> Result<Option<CreditRequest>> {
        Ok(self.read().credit_requests.get(request_id).cloned())
    }

    fn list_credit_requests_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditRequest>> {
        Ok(self
            .read()
            .credit_requests
            .values()
            .rev()
            .filter(|request| request.user_id == *user_id)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn list_pending_credit_requests(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditRequest>> {
        let inner = self.read();
        Ok(inner
            .pending
            .iter()
            .skip(offset)
            .take(limit)
            .filter_map(|id| inner.credit_requests.get(id).cloned())
            .collect())
    }

    fn reject_credit_request(&self, request: &CreditRequest) -> Result<()> {
        let mut inner = self.write();
        let stored = inner
            .credit_requests
            .get(&request.id)
            .ok_or_else(|| StoreError::not_found(Entity::CreditRequest, request.id))?;
        check_resolution(stored, request)?;

        inner.credit_requests.insert(request.id, request.clone());
        inner.pending.remove(&request.id);
        Ok(())
    }

    fn put_proposal(&self, proposal: &GeneratedProposal) -> Result<()> {
        self.write().proposals.insert(proposal.id, proposal.clone());
        Ok(())
    }

    fn get_proposal(&self, proposal_id: &ProposalId) -> Result<Option<GeneratedProposal>> {
        Ok(self.read().proposals.get(proposal_id).cloned())
    }

    fn delete_proposal(&self, proposal_id: &ProposalId) -> Result<()> {
        self.write()
            .proposals
            .remove(proposal_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(Entity::Proposal, proposal_id))
    }

    fn list_proposals_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<GeneratedProposal>> {
        Ok(self
            .read()
            .proposals
            .values()
            .rev()
            .filter(|proposal| proposal.user_id == *user_id)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}
