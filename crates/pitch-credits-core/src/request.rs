//! Credit top-up requests.
//!
//! A user asks for credits; staff approve or reject. The status is a closed
//! state machine:
//!
//! ```text
//! pending ──approve──▶ approved
//!    └─────reject───▶ rejected
//! ```
//!
//! Both outcomes are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CreditRequestId, EntryId, UserId};

/// A user's request for a credit top-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRequest {
    /// Unique request ID.
    pub id: CreditRequestId,

    /// The requesting user.
    pub user_id: UserId,

    /// Number of credits requested. Always positive.
    pub amount: i64,

    /// Optional note for staff.
    pub message: String,

    /// Current status.
    pub status: RequestStatus,

    /// When the request was submitted.
    pub created_at: DateTime<Utc>,

    /// When it left `pending`.
    pub resolved_at: Option<DateTime<Utc>>,

    /// Staff member who resolved it.
    pub resolved_by: Option<UserId>,

    /// The top-up entry written on approval.
    pub ledger_entry_id: Option<EntryId>,
}

impl CreditRequest {
    /// Create a new pending request.
    #[must_use]
    pub fn new(user_id: UserId, amount: i64, message: impl Into<String>) -> Self {
        Self {
            id: CreditRequestId::generate(),
            user_id,
            amount,
            message: message.into(),
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
            resolved_by: None,
            ledger_entry_id: None,
        }
    }

    /// Whether the request can still be acted on.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    /// Return the approved form of this request.
    ///
    /// Returns `None` if the transition is not allowed from the current status.
    #[must_use]
    pub fn approved(&self, staff: UserId, entry: EntryId, at: DateTime<Utc>) -> Option<Self> {
        self.resolved(RequestStatus::Approved, staff, at).map(|mut next| {
            next.ledger_entry_id = Some(entry);
            next
        })
    }

    /// Return the rejected form of this request.
    ///
    /// Returns `None` if the transition is not allowed from the current status.
    #[must_use]
    pub fn rejected(&self, staff: UserId, at: DateTime<Utc>) -> Option<Self> {
        self.resolved(RequestStatus::Rejected, staff, at)
    }

    fn resolved(&self, to: RequestStatus, staff: UserId, at: DateTime<Utc>) -> Option<Self> {
        if !self.status.can_transition_to(to) {
            return None;
        }
        let mut next = self.clone();
        next.status = to;
        next.resolved_at = Some(at);
        next.resolved_by = Some(staff);
        Some(next)
    }
}

/// Status of a credit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting for staff review.
    Pending,
    /// Approved; credits were added.
    Approved,
    /// Rejected; no credits were added.
    Rejected,
}

impl RequestStatus {
    /// The transition table. Only `pending` has outgoing edges.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Approved) | (Self::Pending, Self::Rejected)
        )
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A staff decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Grant the requested credits.
    Approve,
    /// Decline without touching the ledger.
    Reject,
}

impl std::str::FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown decision: {other}")),
        }
    }
}
