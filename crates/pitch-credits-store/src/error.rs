//! Error types for ledger storage.

use std::fmt;

use pitch_credits_core::{CreditsError, RequestStatus};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Kind of record a storage error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    /// An account.
    Account,
    /// A ledger entry.
    Entry,
    /// A credit request.
    CreditRequest,
    /// A generated proposal.
    Proposal,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Account => "account",
            Self::Entry => "ledger entry",
            Self::CreditRequest => "credit request",
            Self::Proposal => "proposal",
        })
    }
}

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// What was looked up.
        entity: Entity,
        /// Its identifier.
        id: String,
    },

    /// Record already exists.
    #[error("{entity} already exists: {id}")]
    AlreadyExists {
        /// What was inserted.
        entity: Entity,
        /// Its identifier.
        id: String,
    },

    /// An append did not match the stored account state. Nothing was written.
    #[error("ledger conflict for {user_id}: {detail}")]
    LedgerConflict {
        /// The affected user.
        user_id: String,
        /// Which check failed.
        detail: String,
    },

    /// A credit request was not in the state the write expected.
    #[error("credit request {request_id} is {status}")]
    InvalidState {
        /// The request.
        request_id: String,
        /// Its stored status.
        status: RequestStatus,
    },
}

impl StoreError {
    pub(crate) fn not_found(entity: Entity, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn conflict(user_id: impl ToString, detail: impl Into<String>) -> Self {
        Self::LedgerConflict {
            user_id: user_id.to_string(),
            detail: detail.into(),
        }
    }
}

impl From<StoreError> for CreditsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound {
                entity: Entity::Account,
                id,
            } => Self::AccountNotFound { user_id: id },
            StoreError::NotFound {
                entity: Entity::CreditRequest,
                id,
            } => Self::CreditRequestNotFound { request_id: id },
            StoreError::NotFound {
                entity: Entity::Proposal,
                id,
            } => Self::ProposalNotFound { proposal_id: id },
            StoreError::NotFound { entity, id } => {
                Self::Storage(format!("{entity} not found: {id}"))
            }
            StoreError::AlreadyExists {
                entity: Entity::Account,
                id,
            } => Self::AccountAlreadyExists { user_id: id },
            StoreError::AlreadyExists { entity, id } => {
                Self::Storage(format!("{entity} already exists: {id}"))
            }
            StoreError::LedgerConflict { user_id, detail } => {
                Self::LedgerConsistency { user_id, detail }
            }
            StoreError::InvalidState { request_id, status } => {
                Self::InvalidRequestState { request_id, status }
            }
            StoreError::Database(msg) => Self::Storage(msg),
            StoreError::Serialization(msg) => Self::Serialization(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_become_consistency_errors() {
        let err: CreditsError = StoreError::conflict("u1", "balance mismatch").into();
        assert!(matches!(err, CreditsError::LedgerConsistency { .. }));
    }

    #[test]
    fn missing_accounts_keep_their_meaning() {
        let err: CreditsError = StoreError::not_found(Entity::Account, "u1").into();
        assert!(matches!(err, CreditsError::AccountNotFound { user_id } if user_id == "u1"));
    }

    #[test]
    fn stale_requests_become_invalid_state() {
        let err: CreditsError = StoreError::InvalidState {
            request_id: "r1".into(),
            status: RequestStatus::Approved,
        }
        .into();
        assert!(matches!(
            err,
            CreditsError::InvalidRequestState {
                status: RequestStatus::Approved,
                ..
            }
        ));
    }
}
