//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Account records, keyed by `user_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Ledger entries, keyed by `entry_id` (ULID).
    pub const ENTRIES: &str = "ledger_entries";

    /// Index: entries by user, keyed by `user_id || sequence`.
    /// Value is the entry ID.
    pub const ENTRIES_BY_USER: &str = "ledger_entries_by_user";

    /// Credit requests, keyed by `request_id` (ULID).
    pub const CREDIT_REQUESTS: &str = "credit_requests";

    /// Index: requests by user, keyed by `user_id || request_id`.
    /// Value is empty (index only).
    pub const CREDIT_REQUESTS_BY_USER: &str = "credit_requests_by_user";

    /// Index: pending requests, keyed by `request_id`.
    /// Value is empty; the key is removed when the request is resolved.
    pub const PENDING_CREDIT_REQUESTS: &str = "pending_credit_requests";

    /// Generated proposals, keyed by `proposal_id` (ULID).
    pub const PROPOSALS: &str = "proposals";

    /// Index: proposals by user, keyed by `user_id || proposal_id`.
    /// Value is empty (index only).
    pub const PROPOSALS_BY_USER: &str = "proposals_by_user";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::ENTRIES,
        cf::ENTRIES_BY_USER,
        cf::CREDIT_REQUESTS,
        cf::CREDIT_REQUESTS_BY_USER,
        cf::PENDING_CREDIT_REQUESTS,
        cf::PROPOSALS,
        cf::PROPOSALS_BY_USER,
    ]
}
