//! Caller identity extractors.
//!
//! The service sits behind the application that authenticates users and
//! forwards their identity in headers:
//!
//! - `x-user-id`: the user's UUID (required on every `/v1` route)
//! - `x-user-role`: `staff` for privileged callers, anything else or absent
//!   for regular members
//!
//! This module provides:
//! - `AuthUser` - any identified caller
//! - `StaffUser` - a caller with the staff role

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use pitch_credits_core::{Actor, UserId};

use crate::error::ApiError;

/// Header carrying the caller's user ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the caller's role.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Role value granting staff privileges.
pub const STAFF_ROLE: &str = "staff";

/// An identified caller.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    /// The user ID.
    pub user_id: UserId,
    /// Whether the caller carries the staff role.
    pub is_staff: bool,
}

impl AuthUser {
    /// The caller as a ledger actor.
    #[must_use]
    pub fn actor(&self) -> Actor {
        if self.is_staff {
            Actor::staff(self.user_id)
        } else {
            Actor::member(self.user_id)
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?
            .trim()
            .parse::<UserId>()
            .map_err(|_| ApiError::Unauthorized)?;

        let is_staff = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|role| role.trim().eq_ignore_ascii_case(STAFF_ROLE));

        Ok(Self { user_id, is_staff })
    }
}

/// A caller with staff privileges.
#[derive(Debug, Clone, Copy)]
pub struct StaffUser {
    /// The staff member's user ID.
    pub user_id: UserId,
}

impl StaffUser {
    /// The caller as a ledger actor.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::staff(self.user_id)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;

        if !user.is_staff {
            tracing::warn!(user_id = %user.user_id, "Staff endpoint called without staff role");
            return Err(ApiError::Forbidden);
        }

        Ok(Self {
            user_id: user.user_id,
        })
    }
}
