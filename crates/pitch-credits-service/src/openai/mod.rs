//! Proposal text generation.
//!
//! [`ProposalGenerator`] is the external operation behind the metered
//! generation endpoint. [`OpenAiGenerator`] talks to any OpenAI-compatible
//! chat-completions API.

pub mod client;
pub mod prompt;
pub mod types;

use async_trait::async_trait;

use pitch_credits_core::ProposalBrief;

pub use client::{GenerationError, OpenAiGenerator};

/// Produces proposal text for a brief.
///
/// The returned text still contains the name placeholder; the ledger replaces
/// it when the proposal is saved.
#[async_trait]
pub trait ProposalGenerator: Send + Sync {
    /// Draft a proposal for `brief`.
    async fn generate(&self, brief: &ProposalBrief) -> Result<String, GenerationError>;
}

/// Generator used when no API key is configured. Every call fails, so
/// nothing is ever charged.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableGenerator;

#[async_trait]
impl ProposalGenerator for UnavailableGenerator {
    async fn generate(&self, _brief: &ProposalBrief) -> Result<String, GenerationError> {
        Err(GenerationError::Configuration(
            "proposal generation is not configured".into(),
        ))
    }
}
