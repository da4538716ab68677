//! Core types for the pitch-credits ledger.
//!
//! This crate provides the foundational types shared by the store, the
//! ledger and the HTTP service:
//!
//! - **Identifiers**: `UserId`, `EntryId`, `CreditRequestId`, `ProposalId`
//! - **Accounts**: `Account`, `Actor`, `Role`
//! - **Ledger**: `LedgerEntry`, `Adjustment`, `EntryReason`, `PaymentMethod`
//! - **Requests**: `CreditRequest`, `RequestStatus`, `Decision`
//! - **Proposals**: `GeneratedProposal`, `ProposalBrief`, `Platform`
//!
//! # Credit unit
//!
//! Credits are whole numbers stored as `i64`. One AI proposal generation
//! costs one credit by default.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod proposal;
pub mod request;

pub use account::{Account, Actor, Role};
pub use error::{CreditsError, ExternalFailure, Result};
pub use ids::{CreditRequestId, EntryId, IdError, ProposalId, UserId};
pub use ledger::{Adjustment, EntryReason, LedgerEntry, PaymentMethod};
pub use proposal::{GeneratedProposal, Platform, ProposalBrief, NAME_PLACEHOLDER};
pub use request::{CreditRequest, Decision, RequestStatus};
