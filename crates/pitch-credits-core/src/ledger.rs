//! Ledger entry types.
//!
//! Every change to an account balance produces exactly one immutable
//! [`LedgerEntry`]. Replaying a user's entries in sequence order from zero
//! reproduces the current balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EntryId, UserId};

/// An immutable audit record of one balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry ID.
    pub id: EntryId,

    /// The user whose balance changed.
    pub user_id: UserId,

    /// Position in the user's ledger, starting at 1. Strictly increasing in
    /// commit order.
    pub sequence: u64,

    /// Signed change. Positive = credit, negative = debit.
    pub delta: i64,

    /// Why the balance changed.
    pub reason: EntryReason,

    /// How the value was received (or `Other` for system actions).
    pub method: PaymentMethod,

    /// Free-text note, e.g. the artifact or request this entry refers to.
    pub note: String,

    /// Balance immediately after this entry was applied.
    pub balance_after: i64,

    /// When the entry was created.
    pub created_at: DateTime<Utc>,

    /// Staff member who performed the action; `None` for system actions.
    pub acting_staff: Option<UserId>,
}

/// Reason for a balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryReason {
    /// Credits bought or granted through an approved top-up.
    TopUp,
    /// Credits redeemed from a voucher.
    Voucher,
    /// Credits spent on a metered generation.
    GenerationCharge,
    /// Credits returned to the user.
    Refund,
    /// Manual correction by staff.
    AdminAdjust,
}

impl EntryReason {
    /// Reasons staff may pick when adjusting a balance by hand.
    pub const STAFF_SELECTABLE: [Self; 3] = [Self::TopUp, Self::AdminAdjust, Self::Refund];

    /// Whether staff may use this reason for a manual adjustment.
    #[must_use]
    pub fn is_staff_selectable(self) -> bool {
        Self::STAFF_SELECTABLE.contains(&self)
    }

    /// Stable lowercase name, as used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TopUp => "top_up",
            Self::Voucher => "voucher",
            Self::GenerationCharge => "generation_charge",
            Self::Refund => "refund",
            Self::AdminAdjust => "admin_adjust",
        }
    }
}

/// How credits were paid for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Paid in cash.
    Cash,
    /// Bank or mobile transfer.
    Transfer,
    /// Not applicable or unknown.
    #[default]
    Other,
}

impl PaymentMethod {
    /// Stable lowercase name, as used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Transfer => "transfer",
            Self::Other => "other",
        }
    }
}

/// A requested balance change, before it has been applied.
///
/// This is the input to the balance adjuster. It carries the audit metadata
/// that ends up on the resulting [`LedgerEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjustment {
    /// The user whose balance changes.
    pub user_id: UserId,
    /// Signed change to apply.
    pub delta: i64,
    /// Why.
    pub reason: EntryReason,
    /// How it was paid.
    pub method: PaymentMethod,
    /// Free-text note.
    pub note: String,
    /// Staff member performing the change, if any.
    pub acting_staff: Option<UserId>,
}

impl Adjustment {
    /// A system-initiated adjustment with method `Other` and no note.
    #[must_use]
    pub fn new(user_id: UserId, delta: i64, reason: EntryReason) -> Self {
        Self {
            user_id,
            delta,
            reason,
            method: PaymentMethod::Other,
            note: String::new(),
            acting_staff: None,
        }
    }

    /// Set the payment method.
    #[must_use]
    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Record the staff member responsible.
    #[must_use]
    pub fn by_staff(mut self, staff: UserId) -> Self {
        self.acting_staff = Some(staff);
        self
    }

    /// Turn this adjustment into the entry that records it.
    #[must_use]
    pub fn into_entry(self, sequence: u64, balance_after: i64, at: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            id: EntryId::generate(),
            user_id: self.user_id,
            sequence,
            delta: self.delta,
            reason: self.reason,
            method: self.method,
            note: self.note,
            balance_after,
            created_at: at,
            acting_staff: self.acting_staff,
        }
    }
}
