//! Error types for the credits ledger.

use crate::ids::IdError;
use crate::RequestStatus;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, CreditsError>;

/// Errors that can occur in ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum CreditsError {
    /// A debit would drive the balance below zero.
    ///
    /// Recoverable by the caller (top up and try again); never retried
    /// automatically.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Balance at the time of the check.
        balance: i64,
        /// Credits the operation needed.
        required: i64,
    },

    /// The credit request is no longer pending.
    #[error("credit request {request_id} is already {status}")]
    InvalidRequestState {
        /// The request acted on.
        request_id: String,
        /// Its current status.
        status: RequestStatus,
    },

    /// The metered external operation failed; nothing was charged.
    #[error("external operation {kind}: {message}")]
    ExternalOperation {
        /// What went wrong.
        kind: ExternalFailure,
        /// Details from the operation.
        message: String,
    },

    /// Stored balance and ledger disagree. Indicates a concurrency-control
    /// bug; the write was aborted.
    #[error("ledger consistency violated for {user_id}: {detail}")]
    LedgerConsistency {
        /// The affected user.
        user_id: String,
        /// What did not match.
        detail: String,
    },

    /// Account not found.
    #[error("account not found: {user_id}")]
    AccountNotFound {
        /// The user ID that was not found.
        user_id: String,
    },

    /// Account already exists.
    #[error("account already exists: {user_id}")]
    AccountAlreadyExists {
        /// The user ID that already exists.
        user_id: String,
    },

    /// Credit request not found.
    #[error("credit request not found: {request_id}")]
    CreditRequestNotFound {
        /// The request ID that was not found.
        request_id: String,
    },

    /// Generated proposal not found, or owned by someone else.
    #[error("proposal not found: {proposal_id}")]
    ProposalNotFound {
        /// The proposal ID that was not found.
        proposal_id: String,
    },

    /// Amount is zero, negative where a positive one is required, or otherwise unusable.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The actor lacks the privileges for this action.
    #[error("not permitted: {0}")]
    NotPermitted(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}

impl CreditsError {
    /// Whether this error means the balance was too low.
    #[must_use]
    pub const fn is_insufficient_credits(&self) -> bool {
        matches!(self, Self::InsufficientCredits { .. })
    }
}

/// Ways a metered external operation can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalFailure {
    /// The operation returned an error.
    Failed,
    /// The operation succeeded but produced nothing usable.
    EmptyResult,
    /// The operation did not finish in time.
    TimedOut,
}

impl std::fmt::Display for ExternalFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Failed => "failed",
            Self::EmptyResult => "returned an empty result",
            Self::TimedOut => "timed out",
        })
    }
}
