//! Regions and towns from PostgreSQL, read through the Redis cache.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::PgPool;
use std::future::Future;
use tracing::instrument;

use super::cache::{keys, RedisCache};
use super::gateways::{ReferenceHealth, ReferenceSource};
use crate::db;
use crate::domain::{Region, Town};
use crate::error::ApiError;

/// Database row for region
#[derive(Debug, sqlx::FromRow)]
struct RegionRow {
    id: i64,
    name: String,
}

impl From<RegionRow> for Region {
    fn from(row: RegionRow) -> Self {
        Self {
            id: row.id,
            region: row.name,
        }
    }
}

/// Database row for town
#[derive(Debug, sqlx::FromRow)]
struct TownRow {
    id: i64,
    name: String,
    region_id: i64,
}

impl From<TownRow> for Town {
    fn from(row: TownRow) -> Self {
        Self {
            id: row.id,
            town: row.name,
            region_id: row.region_id,
        }
    }
}

#[derive(Clone)]
pub struct ReferenceRepository {
    db: PgPool,
    cache: RedisCache,
}

impl ReferenceRepository {
    pub fn new(db: PgPool, cache: RedisCache) -> Self {
        Self { db, cache }
    }

    /// Returns the cached value for `key`, loading and caching it with the
    /// default TTL on a miss.
    async fn read_through<T, F, Fut>(&self, key: &str, load: F) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(cached) = self.cache.get::<T>(key).await {
            return Ok(cached);
        }

        let value = load().await?;
        if let Err(e) = self.cache.set(key, &value).await {
            tracing::warn!(key = key, error = %e, "Failed to cache reference data");
        }
        Ok(value)
    }
}

#[async_trait]
impl ReferenceSource for ReferenceRepository {
    #[instrument(skip(self))]
    async fn regions(&self) -> Result<Vec<Region>, ApiError> {
        self.read_through(&keys::regions(), || async {
            let rows = sqlx::query_as::<_, RegionRow>("SELECT id, name FROM regions ORDER BY name")
                .fetch_all(&self.db)
                .await?;
            Ok::<Vec<Region>, ApiError>(rows.into_iter().map(Into::into).collect())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn towns(&self) -> Result<Vec<Town>, ApiError> {
        self.read_through(&keys::towns(), || async {
            let rows = sqlx::query_as::<_, TownRow>(
                r#"
                SELECT id, name, region_id
                FROM towns
                ORDER BY region_id, name
                "#,
            )
            .fetch_all(&self.db)
            .await?;
            Ok::<Vec<Town>, ApiError>(rows.into_iter().map(Into::into).collect())
        })
        .await
    }

    async fn health_check(&self) -> ReferenceHealth {
        let (database, cache) = tokio::join!(db::health_check(&self.db), self.cache.health_check());
        ReferenceHealth {
            database,
            cache: cache.is_ok(),
        }
    }
}
