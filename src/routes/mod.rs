pub mod account;
pub mod health;
pub mod me;
pub mod reference;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::app::AppState;

/// Largest avatar drop request, answered with 413 above it. Below it, an
/// oversized file is rejected by the drop target with a field error.
pub const AVATAR_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        .route("/countries", get(reference::search_countries))
        .route("/regions", get(reference::list_regions))
        .route("/regions/:region_id/towns", get(reference::list_towns))
        // Protected routes
        .route("/me", get(me::get_me))
        // General profile form
        .route(
            "/account/general/session",
            post(account::open_session)
                .get(account::get_session)
                .delete(account::discard_session),
        )
        .route("/account/general/session/fields", patch(account::set_field))
        .route("/account/general/session/region", put(account::select_region))
        .route("/account/general/session/lang", put(account::change_language))
        .route(
            "/account/general/session/phone-numbers/:slot/code",
            put(account::select_phone_code),
        )
        .route(
            "/account/general/session/phone-numbers/:slot/number",
            put(account::set_phone_number),
        )
        .route(
            "/account/general/session/avatar",
            post(account::drop_avatar)
                .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(AVATAR_BODY_LIMIT)),
        )
        .route(
            "/account/general/session/avatar/preview",
            get(account::avatar_preview),
        )
        .route("/account/general/session/submit", post(account::submit))
}
