//! Seams to the systems the form depends on.
//!
//! Handlers and the form service only see these traits, so tests can swap in
//! in-memory implementations.

use async_trait::async_trait;

use crate::auth::AuthContext;
use crate::domain::{Region, Town, UserDto};
use crate::error::ApiError;

/// Reachability of the reference data backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceHealth {
    pub database: bool,
    pub cache: bool,
}

/// Regions and towns offered by the form.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn regions(&self) -> Result<Vec<Region>, ApiError>;

    /// Every town, across all regions.
    async fn towns(&self) -> Result<Vec<Town>, ApiError>;

    async fn health_check(&self) -> ReferenceHealth;
}

/// The user API, acting on behalf of the authenticated caller.
#[async_trait]
pub trait UserGateway: Send + Sync {
    /// Record of the caller.
    async fn current_user(&self, auth: &AuthContext) -> Result<UserDto, ApiError>;

    /// Stores the general section of the caller's record.
    async fn update_general(&self, auth: &AuthContext, user: &UserDto) -> Result<(), ApiError>;

    async fn health_check(&self) -> anyhow::Result<()>;
}
