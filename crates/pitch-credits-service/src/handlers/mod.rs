//! API handlers.

pub mod accounts;
pub mod admin;
pub mod credits;
pub mod health;
pub mod proposals;
pub mod requests;

use serde::Deserialize;

/// Pagination query parameters shared by list endpoints.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Maximum number of items to return (default: 50, capped at 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

/// Hard cap on page sizes.
pub const MAX_PAGE_SIZE: usize = 100;

fn default_limit() -> usize {
    50
}

impl PageQuery {
    /// The requested limit, capped.
    #[must_use]
    pub fn capped_limit(&self) -> usize {
        self.limit.min(MAX_PAGE_SIZE)
    }
}
