//! Key encoding utilities for `RocksDB`.
//!
//! All keys are raw bytes. Per-user indexes start with the 16 UUID bytes of
//! the user so that a prefix scan returns exactly that user's records, in
//! key order.

use pitch_credits_core::{CreditRequestId, EntryId, ProposalId, UserId};

/// Length of a user ID prefix.
pub const USER_PREFIX_LEN: usize = 16;

/// Create an account key from a user ID.
#[must_use]
pub fn account_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create an entry key from an entry ID.
#[must_use]
pub fn entry_key(entry_id: &EntryId) -> Vec<u8> {
    entry_id.to_bytes().to_vec()
}

/// Create a user-entry index key.
///
/// Format: `user_id (16 bytes) || sequence (8 bytes, big-endian)`
///
/// Big-endian sequences sort numerically, so a prefix scan walks the ledger
/// in append order.
#[must_use]
pub fn user_entry_key(user_id: &UserId, sequence: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(USER_PREFIX_LEN + 8);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&sequence.to_be_bytes());
    key
}

/// Create a credit request key.
#[must_use]
pub fn credit_request_key(request_id: &CreditRequestId) -> Vec<u8> {
    request_id.to_bytes().to_vec()
}

/// Create a user-request index key.
///
/// Format: `user_id (16 bytes) || request_id (16 bytes)`
#[must_use]
pub fn user_credit_request_key(user_id: &UserId, request_id: &CreditRequestId) -> Vec<u8> {
    let mut key = Vec::with_capacity(USER_PREFIX_LEN + 16);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&request_id.to_bytes());
    key
}

/// Create a proposal key.
#[must_use]
pub fn proposal_key(proposal_id: &ProposalId) -> Vec<u8> {
    proposal_id.to_bytes().to_vec()
}

/// Create a user-proposal index key.
///
/// Format: `user_id (16 bytes) || proposal_id (16 bytes)`
#[must_use]
pub fn user_proposal_key(user_id: &UserId, proposal_id: &ProposalId) -> Vec<u8> {
    let mut key = Vec::with_capacity(USER_PREFIX_LEN + 16);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&proposal_id.to_bytes());
    key
}

/// Create a prefix for iterating all of a user's index entries.
#[must_use]
pub fn user_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// The largest key a user's index can hold for a suffix of `suffix_len`
/// bytes. Used as the starting point of reverse (newest first) scans.
#[must_use]
pub fn user_prefix_upper_bound(user_id: &UserId, suffix_len: usize) -> Vec<u8> {
    let mut key = Vec::with_capacity(USER_PREFIX_LEN + suffix_len);
    key.extend_from_slice(user_id.as_bytes());
    key.resize(USER_PREFIX_LEN + suffix_len, 0xFF);
    key
}

/// Extract the 16-byte ULID suffix of a user index key.
///
/// Returns `None` if the key is too short.
#[must_use]
pub fn ulid_suffix(key: &[u8]) -> Option<[u8; 16]> {
    key.get(USER_PREFIX_LEN..USER_PREFIX_LEN + 16)?
        .try_into()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_entry_keys_sort_by_sequence() {
        let user_id = UserId::generate();
        let k9 = user_entry_key(&user_id, 9);
        let k10 = user_entry_key(&user_id, 10);
        let k256 = user_entry_key(&user_id, 256);

        assert_eq!(k9.len(), 24);
        assert!(k9 < k10);
        assert!(k10 < k256);
        assert!(k256 < user_prefix_upper_bound(&user_id, 8));
    }

    #[test]
    fn user_request_key_format() {
        let user_id = UserId::generate();
        let request_id = CreditRequestId::generate();
        let key = user_credit_request_key(&user_id, &request_id);

        assert_eq!(key.len(), 32);
        assert_eq!(&key[..16], user_id.as_bytes());
        assert_eq!(ulid_suffix(&key), Some(request_id.to_bytes()));
    }

    #[test]
    fn short_keys_have_no_suffix() {
        assert_eq!(ulid_suffix(&[0u8; 20]), None);
    }
}
