//! HTTP client for the user API.
//!
//! Every call forwards the caller's bearer token. Reads are retried with
//! exponential backoff on transient failures; writes are sent once.

use anyhow::{Context, Result};
use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};
use url::Url;

use super::gateways::UserGateway;
use crate::auth::AuthContext;
use crate::domain::UserDto;
use crate::error::ApiError;

const ACCOUNT_PATH: &str = "/api/account";
const ACCOUNT_GENERAL_PATH: &str = "/api/account/general";

/// Client for the user API.
#[derive(Clone)]
pub struct UserApiClient {
    client: Client,
    base_url: String,
    retry_max_elapsed: Duration,
}

/// Error body returned by the user API.
#[derive(Debug, Deserialize)]
struct UserApiErrorResponse {
    #[serde(alias = "title", alias = "detail")]
    message: Option<String>,
}

impl UserApiClient {
    pub fn new(base_url: &Url, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        tracing::info!(base_url = %base_url, "User API client initialized");

        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            retry_max_elapsed: Duration::from_secs(10),
        })
    }

    /// Overrides how long reads keep retrying.
    pub fn with_retry_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.retry_max_elapsed = max_elapsed;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(100))
            .with_max_elapsed_time(Some(self.retry_max_elapsed))
            .build()
    }

    fn authorized(&self, request: RequestBuilder, auth: &AuthContext) -> RequestBuilder {
        request.bearer_auth(auth.token())
    }

    /// Maps a non-success response to an error.
    async fn error_for(response: Response) -> ApiError {
        let status = response.status();
        let message = response
            .json::<UserApiErrorResponse>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| format!("User API error: {}", status));

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!(status = %status, "User API rejected the caller's token");
                ApiError::Unauthorized("Not allowed to access the account".to_string())
            }
            StatusCode::NOT_FOUND => ApiError::not_found("Account not found"),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ApiError::BadRequest(message),
            _ => {
                error!(status = %status, message = %message, "User API error");
                ApiError::Upstream(message)
            }
        }
    }

    /// Check user API health.
    pub async fn health_check(&self) -> Result<()> {
        let response = self
            .client
            .get(self.url("/health"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("User API health check request failed")?;

        if response.status().is_success() {
            Ok(())
        } else {
            anyhow::bail!("User API unhealthy: {}", response.status())
        }
    }
}

fn is_transient(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[async_trait]
impl UserGateway for UserApiClient {
    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    async fn current_user(&self, auth: &AuthContext) -> Result<UserDto, ApiError> {
        let url = self.url(ACCOUNT_PATH);

        backoff::future::retry(self.backoff(), || async {
            debug!(url = %url, "User API request");

            let response = self
                .authorized(self.client.get(&url), auth)
                .send()
                .await
                .map_err(|e| {
                    warn!(error = %e, "User API request failed, retrying");
                    backoff::Error::transient(ApiError::Upstream("User API unavailable".to_string()))
                })?;

            let status = response.status();
            if status.is_success() {
                return response.json::<UserDto>().await.map_err(|e| {
                    error!(error = %e, "Failed to parse user API response");
                    backoff::Error::permanent(ApiError::Upstream("Invalid user API response".to_string()))
                });
            }

            let error = Self::error_for(response).await;
            if is_transient(status) {
                warn!(status = %status, "User API unavailable, retrying");
                Err(backoff::Error::transient(error))
            } else {
                Err(backoff::Error::permanent(error))
            }
        })
        .await
    }

    #[instrument(skip(self, auth, user), fields(user_id = %auth.user_id))]
    async fn update_general(&self, auth: &AuthContext, user: &UserDto) -> Result<(), ApiError> {
        let url = self.url(ACCOUNT_GENERAL_PATH);
        debug!(url = %url, "User API request");

        let response = self
            .authorized(self.client.put(&url), auth)
            .json(user)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "User API request failed");
                ApiError::Upstream("User API unavailable".to_string())
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_for(response).await)
        }
    }

    async fn health_check(&self) -> Result<()> {
        UserApiClient::health_check(self).await
    }
}
