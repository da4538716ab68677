//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Multi-record writes go through a single `WriteBatch`, so an entry is never
//! visible without the balance it produced.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use pitch_credits_core::{
    Account, CreditRequest, CreditRequestId, EntryId, GeneratedProposal, LedgerEntry, ProposalId,
    UserId,
};

use crate::error::{Entity, Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{check_resolution, checked_account_update, LedgerAppend, Store};

/// RocksDB-backed storage implementation.
///
/// The store checks every append against the stored account, but the
/// read-check-write sequence is not locked here, and neither is the
/// existence check in `create_account`. Writers must serialize account
/// creation and appends per user, as the ledger's per-user locks do.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Read and decode a single record.
    fn get_value<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Walk a per-user index from its newest key backwards.
    ///
    /// Returns `(key, value)` pairs after skipping `offset` and stopping at
    /// `limit`.
    fn scan_user_index_newest_first(
        &self,
        cf_name: &str,
        user_id: &UserId,
        suffix_len: usize,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<(Box<[u8]>, Box<[u8]>)>> {
        let cf = self.cf(cf_name)?;
        let prefix = keys::user_prefix(user_id);
        let upper = keys::user_prefix_upper_bound(user_id, suffix_len);

        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&upper, Direction::Reverse));

        let mut out = Vec::new();
        let mut skipped = 0;
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            if out.len() >= limit {
                break;
            }
            out.push((key, value));
        }
        Ok(out)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    fn create_account(&self, account: &Account) -> Result<()> {
        if self.get_account(&account.user_id)?.is_some() {
            return Err(StoreError::AlreadyExists {
                entity: Entity::Account,
                id: account.user_id.to_string(),
            });
        }

        let cf = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(&account.user_id);
        let value = Self::serialize(account)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        self.get_value(cf::ACCOUNTS, &keys::account_key(user_id))
    }

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    fn append_entry(&self, append: &LedgerAppend<'_>) -> Result<EntryId> {
        let entry = append.entry;
        let stored = self
            .get_account(&entry.user_id)?
            .ok_or_else(|| StoreError::not_found(Entity::Account, entry.user_id))?;
        let account = checked_account_update(&stored, append)?;

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_entries = self.cf(cf::ENTRIES)?;
        let cf_by_user = self.cf(cf::ENTRIES_BY_USER)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_accounts,
            keys::account_key(&entry.user_id),
            Self::serialize(&account)?,
        );
        batch.put_cf(&cf_entries, keys::entry_key(&entry.id), Self::serialize(entry)?);
        batch.put_cf(
            &cf_by_user,
            keys::user_entry_key(&entry.user_id, entry.sequence),
            entry.id.to_bytes(),
        );

        if let Some(request) = append.resolves {
            let stored_request = self
                .get_credit_request(&request.id)?
                .ok_or_else(|| StoreError::not_found(Entity::CreditRequest, request.id))?;
            check_resolution(&stored_request, request)?;
            if request.user_id != entry.user_id {
                return Err(StoreError::conflict(
                    entry.user_id,
                    format!("request {} belongs to another user", request.id),
                ));
            }

            let cf_requests = self.cf(cf::CREDIT_REQUESTS)?;
            let cf_pending = self.cf(cf::PENDING_CREDIT_REQUESTS)?;
            let request_key = keys::credit_request_key(&request.id);
            batch.put_cf(&cf_requests, &request_key, Self::serialize(request)?);
            batch.delete_cf(&cf_pending, &request_key);
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(entry.id)
    }

    fn get_entry(&self, entry_id: &EntryId) -> Result<Option<LedgerEntry>> {
        self.get_value(cf::ENTRIES, &keys::entry_key(entry_id))
    }

    fn list_entries(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let index =
            self.scan_user_index_newest_first(cf::ENTRIES_BY_USER, user_id, 8, limit, offset)?;

        let mut entries = Vec::with_capacity(index.len());
        for (_, value) in index {
            let bytes = <[u8; 16]>::try_from(&value[..])
                .map_err(|_| StoreError::Database("malformed entry index value".into()))?;
            let entry_id = EntryId::from_bytes(bytes);
            let entry = self
                .get_entry(&entry_id)?
                .ok_or_else(|| StoreError::not_found(Entity::Entry, entry_id))?;
            entries.push(entry);
        }
        Ok(entries)
    }

    // =========================================================================
    // Credit Request Operations
    // =========================================================================

    fn put_credit_request(&self, request: &CreditRequest) -> Result<()> {
        if self.get_credit_request(&request.id)?.is_some() {
            return Err(StoreError::AlreadyExists {
                entity: Entity::CreditRequest,
                id: request.id.to_string(),
            });
        }

        let cf_requests = self.cf(cf::CREDIT_REQUESTS)?;
        let cf_by_user = self.cf(cf::CREDIT_REQUESTS_BY_USER)?;
        let request_key = keys::credit_request_key(&request.id);

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_requests, &request_key, Self::serialize(request)?);
        batch.put_cf(
            &cf_by_user,
            keys::user_credit_request_key(&request.user_id, &request.id),
            [],
        );
        if request.is_pending() {
            let cf_pending = self.cf(cf::PENDING_CREDIT_REQUESTS)?;
            batch.put_cf(&cf_pending, &request_key, []);
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_credit_request(&self, request_id: &CreditRequestId) -> Result<Option<CreditRequest>> {
        self.get_value(cf::CREDIT_REQUESTS, &keys::credit_request_key(request_id))
    }

    fn list_credit_requests_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditRequest>> {
        let index = self.scan_user_index_newest_first(
            cf::CREDIT_REQUESTS_BY_USER,
            user_id,
            16,
            limit,
            offset,
        )?;

        let mut requests = Vec::with_capacity(index.len());
        for (key, _) in index {
            let Some(bytes) = keys::ulid_suffix(&key) else {
                continue;
            };
            if let Some(request) = self.get_credit_request(&CreditRequestId::from_bytes(bytes))? {
                requests.push(request);
            }
        }
        Ok(requests)
    }

    fn list_pending_credit_requests(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditRequest>> {
        let cf_pending = self.cf(cf::PENDING_CREDIT_REQUESTS)?;

        let mut requests = Vec::new();
        for item in self
            .db
            .iterator_cf(&cf_pending, IteratorMode::Start)
            .skip(offset)
        {
            if requests.len() >= limit {
                break;
            }
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let bytes = <[u8; 16]>::try_from(&key[..])
                .map_err(|_| StoreError::Database("malformed pending index key".into()))?;
            if let Some(request) = self.get_credit_request(&CreditRequestId::from_bytes(bytes))? {
                requests.push(request);
            }
        }
        Ok(requests)
    }

    fn reject_credit_request(&self, request: &CreditRequest) -> Result<()> {
        let stored = self
            .get_credit_request(&request.id)?
            .ok_or_else(|| StoreError::not_found(Entity::CreditRequest, request.id))?;
        check_resolution(&stored, request)?;

        let cf_requests = self.cf(cf::CREDIT_REQUESTS)?;
        let cf_pending = self.cf(cf::PENDING_CREDIT_REQUESTS)?;
        let request_key = keys::credit_request_key(&request.id);

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_requests, &request_key, Self::serialize(request)?);
        batch.delete_cf(&cf_pending, &request_key);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    // =========================================================================
    // Proposal Operations
    // =========================================================================

    fn put_proposal(&self, proposal: &GeneratedProposal) -> Result<()> {
        let cf_proposals = self.cf(cf::PROPOSALS)?;
        let cf_by_user = self.cf(cf::PROPOSALS_BY_USER)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_proposals,
            keys::proposal_key(&proposal.id),
            Self::serialize(proposal)?,
        );
        batch.put_cf(
            &cf_by_user,
            keys::user_proposal_key(&proposal.user_id, &proposal.id),
            [],
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_proposal(&self, proposal_id: &ProposalId) -> Result<Option<GeneratedProposal>> {
        self.get_value(cf::PROPOSALS, &keys::proposal_key(proposal_id))
    }

    fn delete_proposal(&self, proposal_id: &ProposalId) -> Result<()> {
        let proposal = self
            .get_proposal(proposal_id)?
            .ok_or_else(|| StoreError::not_found(Entity::Proposal, proposal_id))?;

        let cf_proposals = self.cf(cf::PROPOSALS)?;
        let cf_by_user = self.cf(cf::PROPOSALS_BY_USER)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_proposals, keys::proposal_key(proposal_id));
        batch.delete_cf(
            &cf_by_user,
            keys::user_proposal_key(&proposal.user_id, proposal_id),
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn list_proposals_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<GeneratedProposal>> {
        let index =
            self.scan_user_index_newest_first(cf::PROPOSALS_BY_USER, user_id, 16, limit, offset)?;

        let mut proposals = Vec::with_capacity(index.len());
        for (key, _) in index {
            let Some(bytes) = keys::ulid_suffix(&key) else {
                continue;
            };
            if let Some(proposal) = self.get_proposal(&ProposalId::from_bytes(bytes))? {
                proposals.push(proposal);
            }
        }
        Ok(proposals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pitch_credits_core::{Adjustment, EntryReason, Platform, RequestStatus};
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn append(store: &RocksStore, user_id: UserId, delta: i64) -> LedgerEntry {
        let account = store.get_account(&user_id).unwrap().unwrap();
        let entry = Adjustment::new(user_id, delta, EntryReason::AdminAdjust).into_entry(
            account.next_sequence(),
            account.balance + delta,
            Utc::now(),
        );
        store
            .append_entry(&LedgerAppend::new(account.balance, &entry))
            .unwrap();
        entry
    }

    #[test]
    fn account_create_and_read() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();

        store.create_account(&Account::new(user_id)).unwrap();

        assert_eq!(store.get_balance(&user_id).unwrap(), 0);
        assert!(matches!(
            store.create_account(&Account::new(user_id)),
            Err(StoreError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn entries_list_newest_first_in_append_order() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        store.create_account(&Account::new(user_id)).unwrap();

        // more than 255 entries so the sequence crosses a byte boundary
        for _ in 0..300 {
            append(&store, user_id, 1);
        }
        append(&store, user_id, -5);

        let entries = store.list_entries(&user_id, 3, 0).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].sequence, 301);
        assert_eq!(entries[0].balance_after, 295);
        assert_eq!(entries[1].sequence, 300);

        let page = store.list_entries(&user_id, 2, 299).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].sequence, 2);
        assert_eq!(page[1].sequence, 1);

        assert_eq!(store.get_balance(&user_id).unwrap(), 295);
    }

    #[test]
    fn entries_of_other_users_are_not_listed() {
        let (store, _dir) = create_test_store();
        let alice = UserId::generate();
        let bob = UserId::generate();
        store.create_account(&Account::new(alice)).unwrap();
        store.create_account(&Account::new(bob)).unwrap();

        append(&store, alice, 10);
        append(&store, bob, 20);
        append(&store, bob, 30);

        assert_eq!(store.list_entries(&alice, 10, 0).unwrap().len(), 1);
        assert_eq!(store.list_entries(&bob, 10, 0).unwrap().len(), 2);
    }

    #[test]
    fn conflicting_append_writes_nothing() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        store.create_account(&Account::new(user_id)).unwrap();
        append(&store, user_id, 5);

        let stale = Adjustment::new(user_id, -1, EntryReason::GenerationCharge)
            .into_entry(2, -1, Utc::now());
        let result = store.append_entry(&LedgerAppend::new(0, &stale));

        assert!(matches!(result, Err(StoreError::LedgerConflict { .. })));
        assert_eq!(store.get_balance(&user_id).unwrap(), 5);
        assert!(store.get_entry(&stale.id).unwrap().is_none());
        assert_eq!(store.list_entries(&user_id, 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn approval_settles_request_in_same_write() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let staff = UserId::generate();
        store.create_account(&Account::new(user_id)).unwrap();

        let request = CreditRequest::new(user_id, 100, "");
        store.put_credit_request(&request).unwrap();
        assert_eq!(store.list_pending_credit_requests(10, 0).unwrap().len(), 1);

        let entry = Adjustment::new(user_id, 100, EntryReason::TopUp)
            .by_staff(staff)
            .into_entry(1, 100, Utc::now());
        let approved = request.approved(staff, entry.id, Utc::now()).unwrap();
        store
            .append_entry(&LedgerAppend::new(0, &entry).resolving(&approved))
            .unwrap();

        let stored = store.get_credit_request(&request.id).unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Approved);
        assert!(store.list_pending_credit_requests(10, 0).unwrap().is_empty());
        assert_eq!(store.get_balance(&user_id).unwrap(), 100);

        // a second settlement of the same request is refused
        let again = Adjustment::new(user_id, 100, EntryReason::TopUp)
            .into_entry(2, 200, Utc::now());
        let result = store.append_entry(&LedgerAppend::new(100, &again).resolving(&approved));
        assert!(matches!(result, Err(StoreError::InvalidState { .. })));
        assert_eq!(store.get_balance(&user_id).unwrap(), 100);
    }

    #[test]
    fn rejection_requires_pending_request() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let staff = UserId::generate();

        let request = CreditRequest::new(user_id, 10, "please");
        store.put_credit_request(&request).unwrap();

        let rejected = request.rejected(staff, Utc::now()).unwrap();
        store.reject_credit_request(&rejected).unwrap();

        assert!(matches!(
            store.reject_credit_request(&rejected),
            Err(StoreError::InvalidState {
                status: RequestStatus::Rejected,
                ..
            })
        ));
        assert_eq!(
            store.list_credit_requests_by_user(&user_id, 10, 0).unwrap()[0].status,
            RequestStatus::Rejected
        );
    }

    #[test]
    fn proposals_can_be_deleted() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let proposal = GeneratedProposal {
            id: ProposalId::generate(),
            user_id,
            platform: Platform::Fiverr,
            tone: "Friendly".into(),
            job_title: String::new(),
            job_description: "logo".into(),
            proposal_text: "Hello".into(),
            created_at: Utc::now(),
        };

        store.put_proposal(&proposal).unwrap();
        assert_eq!(store.list_proposals_by_user(&user_id, 10, 0).unwrap().len(), 1);

        store.delete_proposal(&proposal.id).unwrap();
        assert!(store.get_proposal(&proposal.id).unwrap().is_none());
        assert!(store.list_proposals_by_user(&user_id, 10, 0).unwrap().is_empty());
        assert!(matches!(
            store.delete_proposal(&proposal.id),
            Err(StoreError::NotFound { .. })
        ));
    }
}
