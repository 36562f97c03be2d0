use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use profile_form_backend::services::{
    AccountDirectory, ProfileFormService, RedisCache, ReferenceRepository, UserApiClient,
};
use profile_form_backend::{app, auth, config, db, i18n, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        "Starting profile form backend"
    );

    // Create database pool and bring the reference tables up to date
    let pool = db::create_pool(&settings).await?;
    db::run_migrations(&pool).await?;

    // Create Redis cache
    let cache = RedisCache::new(&settings.redis_url, settings.redis_cache_ttl_seconds).await?;
    tracing::info!("Redis cache initialized");

    // Create user API client
    let user_api = UserApiClient::new(&settings.user_api_url, settings.user_api_timeout_seconds)?;

    // Check user API health without blocking startup
    tokio::spawn({
        let user_api = user_api.clone();
        async move {
            match user_api.health_check().await {
                Ok(()) => tracing::info!("User API is healthy"),
                Err(e) => tracing::warn!(error = %e, "User API health check failed - will retry on first request"),
            }
        }
    });

    // Create JWKS cache for JWT verification
    let jwks_cache = auth::JwksCache::new(
        settings.supabase_jwt_jwks_url.clone(),
        settings.supabase_jwt_issuer.clone(),
        settings.supabase_jwt_audience.clone(),
        settings.jwks_cache_ttl_seconds,
    );

    if let Err(e) = jwks_cache.warm_cache().await {
        tracing::warn!(error = %e, "Failed to warm JWKS cache - will fetch on first request");
    }

    // Translation catalogs, reference data and the caller's account feed the form
    let locales = i18n::Locales::bundled(&settings.default_lang_key)?;
    let reference = Arc::new(ReferenceRepository::new(pool, cache.clone()));
    let accounts = AccountDirectory::new(Arc::new(user_api), Some(cache));
    let forms = ProfileFormService::new(reference, accounts, locales).with_session_idle_timeout(
        chrono::Duration::minutes(i64::from(settings.form_session_idle_minutes)),
    );
    forms.sessions().spawn_sweeper(Duration::from_secs(60));

    // Create application state
    let state = app::AppState::new(settings.clone(), jwks_cache, forms);

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
