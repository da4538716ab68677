//! Common test utilities for pitch-credits integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use serde_json::json;

use pitch_credits_core::{ProposalBrief, UserId};
use pitch_credits_service::{create_router, AppState, GenerationError, ProposalGenerator, ServiceConfig};
use pitch_credits_store::MemoryStore;

/// Generator that replays scripted outcomes, then repeats a fixed draft.
#[derive(Default)]
pub struct ScriptedGenerator {
    outcomes: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<usize>,
}

impl ScriptedGenerator {
    /// Queue the next outcome.
    pub fn push(&self, outcome: Result<&str, &str>) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(outcome.map(str::to_string).map_err(str::to_string));
    }

    /// How often `generate` was called.
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ProposalGenerator for ScriptedGenerator {
    async fn generate(&self, brief: &ProposalBrief) -> Result<String, GenerationError> {
        *self.calls.lock().unwrap() += 1;
        let next = self.outcomes.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(GenerationError::Api {
                status: 500,
                message,
            }),
            None => Ok(format!(
                "Hello,\n\nI would love to help with {}.\n\nBest regards,\n[Your Name]",
                brief.job_title
            )),
        }
    }
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// A test user ID for member requests.
    pub test_user_id: UserId,
    /// A staff user ID for admin requests.
    pub staff_user_id: UserId,
    /// The generator behind `/v1/proposals/generate`.
    pub generator: Arc<ScriptedGenerator>,
}

impl TestHarness {
    /// Create a new test harness with an empty in-memory store.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Create a harness with a custom configuration.
    pub fn with_config(config: ServiceConfig) -> Self {
        let generator = Arc::new(ScriptedGenerator::default());
        let state = AppState::new(Arc::new(MemoryStore::new()), config)
            .with_generator(Arc::clone(&generator) as Arc<dyn ProposalGenerator>);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            test_user_id: UserId::generate(),
            staff_user_id: UserId::generate(),
            generator,
        }
    }

    /// The member's `x-user-id` header value.
    pub fn user_id_header(&self) -> String {
        self.test_user_id.to_string()
    }

    /// The staff member's `x-user-id` header value.
    pub fn staff_id_header(&self) -> String {
        self.staff_user_id.to_string()
    }

    /// Open the test user's account.
    pub async fn open_account(&self) {
        self.server
            .post("/v1/accounts")
            .add_header("x-user-id", self.user_id_header())
            .await
            .assert_status_ok();
    }

    /// Give the test user `amount` credits through a staff top-up.
    pub async fn top_up(&self, amount: i64) {
        self.server
            .post("/v1/admin/credits/adjust")
            .add_header("x-user-id", self.staff_id_header())
            .add_header("x-user-role", "staff")
            .json(&json!({
                "user_id": self.test_user_id.to_string(),
                "delta": amount,
                "reason": "top_up",
                "method": "cash"
            }))
            .await
            .assert_status_ok();
    }

    /// The test user's balance.
    pub async fn balance(&self) -> i64 {
        let response = self
            .server
            .get("/v1/credits/balance")
            .add_header("x-user-id", self.user_id_header())
            .await;
        response.assert_status_ok();
        response.json::<serde_json::Value>()["balance"]
            .as_i64()
            .unwrap()
    }

    /// The test user's ledger entries, newest first.
    pub async fn transactions(&self) -> Vec<serde_json::Value> {
        let response = self
            .server
            .get("/v1/credits/transactions?limit=100")
            .add_header("x-user-id", self.user_id_header())
            .await;
        response.assert_status_ok();
        response.json::<serde_json::Value>()["transactions"]
            .as_array()
            .unwrap()
            .clone()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration used by the harness.
pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        data_dir: String::new(),
        generation_timeout_seconds: 5,
        ..ServiceConfig::default()
    }
}
