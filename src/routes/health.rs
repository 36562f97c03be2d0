use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    pub database: String,
    pub redis: String,
    pub user_api: String,
}

fn status_of(ok: bool) -> String {
    if ok { "ok" } else { "error" }.to_string()
}

/// Health check endpoint - public
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    // Check all services in parallel
    let (reference, user_api) = tokio::join!(
        state.forms.reference().health_check(),
        state.forms.accounts().health_check(),
    );
    let user_api_ok = user_api.is_ok();

    // Without the database the form cannot be opened; the others degrade it
    let status = if reference.database && reference.cache && user_api_ok {
        "healthy"
    } else if reference.database {
        "degraded"
    } else {
        "unhealthy"
    };

    let status_code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services: ServiceHealth {
                database: status_of(reference.database),
                redis: status_of(reference.cache),
                user_api: status_of(user_api_ok),
            },
        }),
    )
}
