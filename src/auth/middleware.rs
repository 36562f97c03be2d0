use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use super::AuthContext;
use crate::app::AppState;
use crate::error::ErrorResponse;
use crate::middleware::request_id;

/// Extractor that requires authentication
/// Use this in route handlers to require a valid JWT
///
/// Example:
/// ```ignore
/// async fn protected_route(auth: RequireAuth) -> impl IntoResponse {
///     format!("Hello, user {}", auth.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthContext);

impl std::ops::Deref for RequireAuth {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    MissingToken,
    InvalidFormat,
    InvalidToken,
}

#[derive(Debug)]
pub struct AuthError {
    pub failure: AuthFailure,
    pub request_id: Option<String>,
}

impl AuthError {
    fn new(failure: AuthFailure, parts: &Parts) -> Self {
        Self {
            failure,
            request_id: request_id(&parts.headers).map(str::to_string),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self.failure {
            AuthFailure::MissingToken => "Missing authorization token",
            AuthFailure::InvalidFormat => "Invalid authorization format",
            AuthFailure::InvalidToken => "Invalid or expired token",
        };

        let body = ErrorResponse {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            errors: None,
            request_id: self.request_id,
        };

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Parse Bearer token
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|rejection| {
                    let failure = if rejection.is_missing() {
                        AuthFailure::MissingToken
                    } else {
                        AuthFailure::InvalidFormat
                    };
                    AuthError::new(failure, parts)
                })?;

        let token = bearer.token();
        if token.is_empty() {
            return Err(AuthError::new(AuthFailure::MissingToken, parts));
        }

        // Verify token
        let claims = state.jwks_cache.verify_token(token).await.map_err(|e| {
            tracing::warn!(error = %e, "JWT verification failed");
            AuthError::new(AuthFailure::InvalidToken, parts)
        })?;

        // The raw token is forwarded to the user API
        let context = AuthContext::from_claims_with_token(&claims, token).map_err(|e| {
            tracing::warn!(error = %e, "Failed to build auth context");
            AuthError::new(AuthFailure::InvalidToken, parts)
        })?;

        Ok(RequireAuth(context))
    }
}
