//! Application state.

use std::sync::Arc;
use std::time::Duration;

use pitch_credits_ledger::Ledger;
use pitch_credits_store::Store;

use crate::config::ServiceConfig;
use crate::openai::{OpenAiGenerator, ProposalGenerator, UnavailableGenerator};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The credits ledger, sole writer of balances.
    pub ledger: Arc<Ledger>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Proposal text generator.
    pub generator: Arc<dyn ProposalGenerator>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let timeout = Duration::from_secs(config.generation_timeout_seconds);

        let generator: Arc<dyn ProposalGenerator> = match config.openai_api_key.as_ref() {
            Some(key) => match OpenAiGenerator::new(
                &config.openai_api_url,
                key,
                &config.openai_model,
                timeout,
            ) {
                Ok(client) => {
                    tracing::info!(
                        api_url = %config.openai_api_url,
                        model = %config.openai_model,
                        "Proposal generation enabled"
                    );
                    Arc::new(client)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create generation client");
                    Arc::new(UnavailableGenerator)
                }
            },
            None => {
                tracing::warn!("OpenAI not configured - proposal generation will fail");
                Arc::new(UnavailableGenerator)
            }
        };

        let ledger = Ledger::new(store).with_metered_timeout(timeout);

        Self {
            ledger: Arc::new(ledger),
            config,
            generator,
        }
    }

    /// Replace the proposal generator.
    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn ProposalGenerator>) -> Self {
        self.generator = generator;
        self
    }
}
