//! Pitch-Credits HTTP API Service.
//!
//! This crate exposes the credits ledger over HTTP:
//!
//! - Credit accounts, balances and ledger history
//! - Credit top-up requests and the staff review queue
//! - Metered AI proposal generation
//! - Staff adjustments and ledger audits
//!
//! # Identity
//!
//! Authentication happens in the application in front of this service. It
//! forwards the caller as `x-user-id` and, for staff, `x-user-role: staff`.
//! See [`auth`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers with sync ledger calls are still async for the router

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod openai;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use openai::{GenerationError, OpenAiGenerator, ProposalGenerator};
pub use routes::create_router;
pub use state::AppState;
