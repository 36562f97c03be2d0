//! The caller's account, cached per user.

use std::sync::Arc;
use tracing::instrument;

use super::cache::{keys, ttl, RedisCache};
use super::gateways::UserGateway;
use crate::auth::AuthContext;
use crate::domain::UserDto;
use crate::error::ApiError;

/// Access to the authenticated user's record.
///
/// Reads go through the cache when one is configured. A successful update
/// evicts the cached record so the next read sees the stored state.
#[derive(Clone)]
pub struct AccountDirectory {
    users: Arc<dyn UserGateway>,
    cache: Option<RedisCache>,
}

impl AccountDirectory {
    pub fn new(users: Arc<dyn UserGateway>, cache: Option<RedisCache>) -> Self {
        Self { users, cache }
    }

    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    pub async fn current_user(&self, auth: &AuthContext) -> Result<UserDto, ApiError> {
        if let Some(cache) = &self.cache {
            if let Some(user) = cache.get::<UserDto>(&keys::user(auth.user_id)).await {
                return Ok(user);
            }
        }
        self.refresh(auth).await
    }

    /// Fetches the record again and replaces the cached copy.
    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    pub async fn refresh(&self, auth: &AuthContext) -> Result<UserDto, ApiError> {
        let user = self.users.current_user(auth).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set_with_ttl(&keys::user(auth.user_id), &user, ttl::USER).await {
                tracing::warn!(error = %e, "Failed to cache user record");
            }
        }
        Ok(user)
    }

    #[instrument(skip(self, auth, user), fields(user_id = %auth.user_id))]
    pub async fn update_general(&self, auth: &AuthContext, user: &UserDto) -> Result<(), ApiError> {
        self.users.update_general(auth, user).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.delete(&keys::user(auth.user_id)).await {
                tracing::warn!(error = %e, "Failed to evict cached user record");
            }
        }
        Ok(())
    }

    pub async fn health_check(&self) -> anyhow::Result<()> {
        self.users.health_check().await
    }
}
