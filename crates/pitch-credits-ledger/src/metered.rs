//! The metered operation gate.
//!
//! A metered operation is paid for only when it succeeds:
//!
//! 1. Pre-check the balance. This is a fast path for the caller; the real
//!    guard is the debit in step 3.
//! 2. Run the operation outside any lock, bounded by a timeout.
//! 3. Persist the artifact, then debit the cost.
//! 4. If the debit fails (the balance was spent concurrently), delete the
//!    artifact again and report the debit error.
//!
//! Steps 3 and 4 form a saga: the artifact write and the charge are separate
//! store writes, so the artifact can be observed without its charge for the
//! short time between them.

use std::fmt::Display;
use std::future::Future;

use pitch_credits_core::{
    Adjustment, CreditsError, EntryReason, ExternalFailure, LedgerEntry, Result, UserId,
};

use crate::Ledger;

/// Output of a metered operation.
pub trait MeteredOutput {
    /// Whether the output is unusable and must not be charged for.
    fn is_blank(&self) -> bool;
}

impl MeteredOutput for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

/// Where the artifacts of a metered operation are kept.
pub trait ArtifactStore<T> {
    /// The persisted form of an operation's output.
    type Artifact;

    /// Persist the output of a successful operation for `user_id`.
    fn persist(&self, user_id: UserId, output: T) -> Result<Self::Artifact>;

    /// Note recorded on the charge, e.g. `Proposal #<id>`.
    fn describe(&self, artifact: &Self::Artifact) -> String;

    /// Remove an artifact whose charge could not be made.
    fn discard(&self, artifact: &Self::Artifact) -> Result<()>;
}

/// Result of a metered operation that was charged.
#[derive(Debug, Clone)]
pub struct MeteredReceipt<A> {
    /// The persisted artifact.
    pub artifact: A,
    /// The `generation_charge` entry.
    pub charge: LedgerEntry,
}

impl<A> MeteredReceipt<A> {
    /// Balance after the charge.
    #[must_use]
    pub fn balance(&self) -> i64 {
        self.charge.balance_after
    }
}

impl Ledger {
    /// Run a paid operation and charge `cost` credits for it if it succeeds.
    ///
    /// Nothing is charged and nothing is kept when the operation fails,
    /// times out or yields a blank output. If the balance no longer covers
    /// `cost` once the operation finishes, the artifact is discarded and
    /// `InsufficientCredits` is returned.
    pub async fn run_metered<T, E, Fut, A>(
        &self,
        user_id: UserId,
        cost: i64,
        operation: impl FnOnce() -> Fut,
        artifacts: &A,
    ) -> Result<MeteredReceipt<A::Artifact>>
    where
        T: MeteredOutput,
        E: Display,
        Fut: Future<Output = std::result::Result<T, E>>,
        A: ArtifactStore<T>,
    {
        if cost <= 0 {
            return Err(CreditsError::InvalidAmount(
                "metered cost must be positive".into(),
            ));
        }

        let balance = self.balance(&user_id)?;
        if balance < cost {
            tracing::warn!(
                user_id = %user_id,
                balance,
                cost,
                "Metered operation refused: insufficient credits"
            );
            return Err(CreditsError::InsufficientCredits {
                balance,
                required: cost,
            });
        }

        let output = match tokio::time::timeout(self.metered_timeout, operation()).await {
            Ok(Ok(output)) if output.is_blank() => {
                return Err(external(ExternalFailure::EmptyResult, "no content"));
            }
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(external(ExternalFailure::Failed, e)),
            Err(_) => {
                return Err(external(
                    ExternalFailure::TimedOut,
                    format!("no result after {:?}", self.metered_timeout),
                ));
            }
        };

        let artifact = artifacts.persist(user_id, output)?;
        let note = artifacts.describe(&artifact);

        let charge = Adjustment::new(user_id, -cost, EntryReason::GenerationCharge)
            .with_note(note.clone());
        match self.adjust_entry(charge) {
            Ok(charge) => {
                tracing::info!(
                    user_id = %user_id,
                    artifact = %note,
                    cost,
                    new_balance = charge.balance_after,
                    "Metered operation charged"
                );
                Ok(MeteredReceipt { artifact, charge })
            }
            Err(err) => {
                tracing::warn!(
                    user_id = %user_id,
                    artifact = %note,
                    error = %err,
                    "Charge failed, discarding artifact"
                );
                if let Err(discard_err) = artifacts.discard(&artifact) {
                    tracing::error!(
                        user_id = %user_id,
                        artifact = %note,
                        error = %discard_err,
                        "Compensating discard failed; artifact kept without a charge"
                    );
                }
                Err(err)
            }
        }
    }
}

fn external(kind: ExternalFailure, message: impl Display) -> CreditsError {
    let message = message.to_string();
    tracing::warn!(kind = %kind, message = %message, "Metered operation failed");
    CreditsError::ExternalOperation { kind, message }
}
