//! The pitch-credits ledger.
//!
//! [`Ledger`] is the single writer of account balances. It provides:
//!
//! - **Balance adjuster** ([`Ledger::adjust`]): the only way a balance
//!   changes. Each call appends exactly one immutable entry, atomically with
//!   the balance update, while holding the user's exclusive lock.
//! - **Credit request workflow** ([`Ledger::submit_credit_request`],
//!   [`Ledger::resolve_credit_request`]): pending requests that staff approve
//!   (one top-up entry) or reject (no entry).
//! - **Metered operation gate** ([`Ledger::run_metered`]): runs a paid
//!   external operation and charges for it only if it succeeded, deleting
//!   the produced artifact again if the charge fails.
//! - **Audit** ([`Ledger::audit`]): replays a user's ledger against the
//!   stored balance.
//!
//! # Consistency model
//!
//! Balance and entry are one atomic store write. A metered operation is a
//! saga instead: the artifact write and the charge are separate writes, and
//! a failed charge is compensated by deleting the artifact. Between those
//! two writes the artifact is briefly visible without its charge.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)] // every public operation returns CreditsError

pub mod adjuster;
pub mod audit;
pub mod locks;
pub mod metered;
pub mod proposals;
pub mod requests;

use std::sync::Arc;
use std::time::Duration;

use pitch_credits_store::Store;

pub use audit::AuditReport;
pub use locks::UserLocks;
pub use metered::{ArtifactStore, MeteredOutput, MeteredReceipt};
pub use proposals::ProposalArtifacts;

/// Default number of entries shown in a credits overview.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Default upper bound on how long a metered operation may run.
pub const DEFAULT_METERED_TIMEOUT: Duration = Duration::from_secs(60);

/// The credits ledger.
pub struct Ledger {
    store: Arc<dyn Store>,
    locks: UserLocks,
    metered_timeout: Duration,
}

impl Ledger {
    /// Create a ledger over `store`.
    ///
    /// The ledger must be the only writer of balances in `store`; share one
    /// instance (for example behind an `Arc`) rather than creating several.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            locks: UserLocks::new(),
            metered_timeout: DEFAULT_METERED_TIMEOUT,
        }
    }

    /// Set how long a metered operation may run before it counts as failed.
    #[must_use]
    pub fn with_metered_timeout(mut self, timeout: Duration) -> Self {
        self.metered_timeout = timeout;
        self
    }

    /// The underlying store, for read paths and artifact persistence.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }
}
