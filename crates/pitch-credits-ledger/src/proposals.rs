//! Metered proposal generation.

use std::fmt::Display;
use std::future::Future;

use pitch_credits_core::{
    CreditsError, GeneratedProposal, ProposalBrief, ProposalId, Result, UserId,
};
use pitch_credits_store::Store;

use crate::metered::{ArtifactStore, MeteredReceipt};
use crate::Ledger;

/// Persists generated proposal text as [`GeneratedProposal`] records.
pub struct ProposalArtifacts<'a> {
    store: &'a dyn Store,
    brief: &'a ProposalBrief,
    author: &'a str,
}

impl<'a> ProposalArtifacts<'a> {
    /// Artifacts for one generation from `brief`, signed by `author`.
    #[must_use]
    pub fn new(store: &'a dyn Store, brief: &'a ProposalBrief, author: &'a str) -> Self {
        Self {
            store,
            brief,
            author,
        }
    }
}

impl ArtifactStore<String> for ProposalArtifacts<'_> {
    type Artifact = GeneratedProposal;

    fn persist(&self, user_id: UserId, output: String) -> Result<GeneratedProposal> {
        let proposal = GeneratedProposal::from_brief(user_id, self.brief, &output, self.author);
        self.store.put_proposal(&proposal)?;
        Ok(proposal)
    }

    fn describe(&self, proposal: &GeneratedProposal) -> String {
        format!("Proposal #{}", proposal.id)
    }

    fn discard(&self, proposal: &GeneratedProposal) -> Result<()> {
        self.store.delete_proposal(&proposal.id)?;
        tracing::info!(proposal_id = %proposal.id, "Uncharged proposal discarded");
        Ok(())
    }
}

impl Ledger {
    /// Generate a proposal through `generate` and charge `cost` for it.
    pub async fn generate_proposal<E, Fut>(
        &self,
        user_id: UserId,
        cost: i64,
        brief: &ProposalBrief,
        author: &str,
        generate: impl FnOnce() -> Fut,
    ) -> Result<MeteredReceipt<GeneratedProposal>>
    where
        E: Display,
        Fut: Future<Output = std::result::Result<String, E>>,
    {
        let artifacts = ProposalArtifacts::new(self.store.as_ref(), brief, author);
        self.run_metered(user_id, cost, generate, &artifacts).await
    }

    /// A proposal owned by `user_id`.
    ///
    /// Proposals of other users are reported as not found.
    pub fn proposal(&self, user_id: &UserId, proposal_id: &ProposalId) -> Result<GeneratedProposal> {
        match self.store.get_proposal(proposal_id)? {
            Some(proposal) if proposal.user_id == *user_id => Ok(proposal),
            _ => Err(CreditsError::ProposalNotFound {
                proposal_id: proposal_id.to_string(),
            }),
        }
    }

    /// The user's most recent proposals, newest first.
    pub fn proposals_for(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<GeneratedProposal>> {
        Ok(self.store.list_proposals_by_user(user_id, limit, offset)?)
    }
}
