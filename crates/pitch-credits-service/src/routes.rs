//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, admin, credits, health, proposals, requests};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent generation requests.
/// Each one holds an outbound call to the generation API for up to the
/// generation timeout.
const GENERATION_MAX_CONCURRENT_REQUESTS: usize = 16;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Accounts (`x-user-id`)
/// - `POST /v1/accounts` - Open the caller's credit account
/// - `GET /v1/accounts/me` - Get the caller's account
///
/// ## Credits (`x-user-id`)
/// - `GET /v1/credits` - Balance and recent entries
/// - `GET /v1/credits/balance` - Current balance
/// - `GET /v1/credits/transactions` - Ledger history
/// - `POST /v1/credits/requests` - Request a top-up
/// - `GET /v1/credits/requests` - Own top-up requests
///
/// ## Proposals (`x-user-id`, metered)
/// - `POST /v1/proposals/generate` - Generate and charge
/// - `GET /v1/proposals` - Own generated proposals
/// - `GET /v1/proposals/:id` - One generated proposal
///
/// ## Admin (`x-user-role: staff`)
/// - `GET /v1/admin/credit-requests` - Pending queue
/// - `POST /v1/admin/credit-requests/:id/:decision` - Approve or reject
/// - `POST /v1/admin/credits/adjust` - Manual adjustment
/// - `GET /v1/admin/accounts/:user_id/audit` - Ledger audit
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Generation calls are slow and paid; they get their own, lower limit.
    let proposal_routes = Router::new()
        .route("/", get(proposals::list_proposals))
        .route(
            "/generate",
            post(proposals::generate_proposal)
                .layer(ConcurrencyLimitLayer::new(GENERATION_MAX_CONCURRENT_REQUESTS)),
        )
        .route("/:id", get(proposals::get_proposal));

    let admin_routes = Router::new()
        .route("/credit-requests", get(admin::list_pending_requests))
        .route(
            "/credit-requests/:id/:decision",
            post(admin::resolve_request),
        )
        .route("/credits/adjust", post(admin::adjust_credits))
        .route("/accounts/:user_id/audit", get(admin::audit_account));

    let api_routes = Router::new()
        // Accounts
        .route("/accounts", post(accounts::create_account))
        .route("/accounts/me", get(accounts::get_account))
        // Credits
        .route("/credits", get(credits::overview))
        .route("/credits/balance", get(credits::get_balance))
        .route("/credits/transactions", get(credits::list_transactions))
        .route(
            "/credits/requests",
            post(requests::submit_request).get(requests::list_my_requests),
        )
        .nest("/proposals", proposal_routes)
        .nest("/admin", admin_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
