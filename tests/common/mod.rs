//! Shared fixtures: in-memory gateways, a signing key and app builders.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use httpmock::prelude::*;
use jsonwebtoken::{encode, EncodingKey, Header};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

use profile_form_backend::app::{create_app, AppState};
use profile_form_backend::auth::{AuthContext, Claims, JwksCache};
use profile_form_backend::config::{Environment, Settings};
use profile_form_backend::domain::{Region, Town, UserDto};
use profile_form_backend::error::ApiError;
use profile_form_backend::i18n::Locales;
use profile_form_backend::services::{
    AccountDirectory, ProfileFormService, ReferenceHealth, ReferenceSource, UserGateway,
};

pub const ISSUER: &str = "https://auth.example.com";
pub const AUDIENCE: &str = "authenticated";
pub const KEY_ID: &str = "test-key";

const SIGNING_KEY: &str = include_str!("../fixtures/jwt_signing_key.pem");

/// Public modulus of `fixtures/jwt_signing_key.pem`, base64url encoded.
const SIGNING_KEY_MODULUS: &str = "vdQ4dlWQWcIu8p2P43RlcN-TXChgChy34tK05ivLRnzaW7kmSF2xaxLQF6RVbM1dnuQi5oe34VRG2bc911jbFzX1kl6Fbr0Br8Y0Qr5DE5F0c6ltuWuLn_IittEIITQZ-6A4MYzxtRu28BG-5WJUS7XMnd7q12VRlVKP-BuWz-T-kG2JfOHjz5t9ps0wWwc6dVt7-ZgnsjQVirVsqsvHa3op_0B1BeNYSN3gUTIrEH1R-TLJGmSLFBWUi-mlLjVl9vYNuzzJR9fO-U03O_3IkEYo2ExIBR1q3mtopeB4S0DXBy-Kalu3rJRmaXzib2uOgdGGgZGQBLvOoNX1gb8Axw";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

pub fn regions() -> Vec<Region> {
    vec![
        Region { id: 1, region: "Kyiv".into() },
        Region { id: 2, region: "Lviv".into() },
    ]
}

pub fn towns() -> Vec<Town> {
    vec![
        Town { id: 10, town: "Bucha".into(), region_id: 1 },
        Town { id: 11, town: "Irpin".into(), region_id: 1 },
        Town { id: 20, town: "Drohobych".into(), region_id: 2 },
    ]
}

pub fn stored_user() -> UserDto {
    UserDto {
        user_id: Some("jdoe".into()),
        first_name: Some("John".into()),
        last_name: Some("Doe".into()),
        email: Some("jdoe@example.com".into()),
        lang_key: Some("en".into()),
        birthday: NaiveDate::from_ymd_opt(1990, 5, 1),
        region: Some(1),
        town: Some(11),
        avatar: Some("https://cdn.example.com/jdoe.png".into()),
        sex: Some(1),
        phone_numbers: Some(vec!["380 501234567".into()]),
        about: Some("Hello".into()),
        roles: Some(vec!["ROLE_USER".into()]),
        ..Default::default()
    }
}

/// Region and town tables held in memory.
pub struct StaticReference {
    pub regions: Vec<Region>,
    pub towns: Vec<Town>,
}

impl Default for StaticReference {
    fn default() -> Self {
        Self {
            regions: regions(),
            towns: towns(),
        }
    }
}

#[async_trait]
impl ReferenceSource for StaticReference {
    async fn regions(&self) -> Result<Vec<Region>, ApiError> {
        Ok(self.regions.clone())
    }

    async fn towns(&self) -> Result<Vec<Town>, ApiError> {
        Ok(self.towns.clone())
    }

    async fn health_check(&self) -> ReferenceHealth {
        ReferenceHealth {
            database: true,
            cache: true,
        }
    }
}

/// User API double: one stored record, every update recorded.
#[derive(Default)]
pub struct InMemoryUsers {
    pub stored: Mutex<Option<UserDto>>,
    pub updates: Mutex<Vec<UserDto>>,
    pub fail_updates: Mutex<Option<ApiError>>,
}

impl InMemoryUsers {
    pub fn with_user(user: UserDto) -> Self {
        Self {
            stored: Mutex::new(Some(user)),
            ..Default::default()
        }
    }

    pub fn fail_next_update(&self, error: ApiError) {
        *self.fail_updates.lock() = Some(error);
    }
}

#[async_trait]
impl UserGateway for InMemoryUsers {
    async fn current_user(&self, _auth: &AuthContext) -> Result<UserDto, ApiError> {
        self.stored
            .lock()
            .clone()
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    async fn update_general(&self, _auth: &AuthContext, user: &UserDto) -> Result<(), ApiError> {
        if let Some(error) = self.fail_updates.lock().take() {
            return Err(error);
        }
        self.updates.lock().push(user.clone());

        let mut stored = self.stored.lock();
        let mut merged = stored.clone().unwrap_or_default();
        merged.user_id = user.user_id.clone();
        merged.first_name = user.first_name.clone();
        merged.last_name = user.last_name.clone();
        merged.email = user.email.clone();
        merged.lang_key = user.lang_key.clone();
        merged.birthday = user.birthday;
        merged.region = user.region;
        merged.town = user.town;
        merged.avatar = user.avatar.clone();
        merged.sex = user.sex;
        merged.phone_numbers = user.phone_numbers.clone();
        merged.about = user.about.clone();
        *stored = Some(merged);
        Ok(())
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Reference source whose tables cannot be read.
pub struct FailingReference;

#[async_trait]
impl ReferenceSource for FailingReference {
    async fn regions(&self) -> Result<Vec<Region>, ApiError> {
        Err(ApiError::internal("regions table unreachable"))
    }

    async fn towns(&self) -> Result<Vec<Town>, ApiError> {
        Err(ApiError::internal("towns table unreachable"))
    }

    async fn health_check(&self) -> ReferenceHealth {
        ReferenceHealth {
            database: false,
            cache: false,
        }
    }
}

/// `InMemoryUsers` whose updates wait for `release` once they have
/// signalled `entered`.
#[derive(Default)]
pub struct GatedUsers {
    pub inner: InMemoryUsers,
    pub entered: Notify,
    pub release: Notify,
}

impl GatedUsers {
    pub fn with_user(user: UserDto) -> Self {
        Self {
            inner: InMemoryUsers::with_user(user),
            ..Default::default()
        }
    }
}

#[async_trait]
impl UserGateway for GatedUsers {
    async fn current_user(&self, auth: &AuthContext) -> Result<UserDto, ApiError> {
        self.inner.current_user(auth).await
    }

    async fn update_general(&self, auth: &AuthContext, user: &UserDto) -> Result<(), ApiError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.update_general(auth, user).await
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

pub fn form_service_with(
    reference: Arc<dyn ReferenceSource>,
    users: Arc<dyn UserGateway>,
) -> ProfileFormService {
    let locales = Locales::bundled("en").unwrap();
    let accounts = AccountDirectory::new(users, None);
    ProfileFormService::new(reference, accounts, locales).with_clock(today)
}

pub fn form_service(users: Arc<InMemoryUsers>) -> ProfileFormService {
    form_service_with(Arc::new(StaticReference::default()), users)
}

pub fn claims_for(user_id: Uuid) -> Claims {
    let now = Utc::now().timestamp();
    Claims {
        sub: user_id.to_string(),
        aud: AUDIENCE.to_string(),
        iss: ISSUER.to_string(),
        iat: now,
        exp: now + 3600,
        nbf: None,
        email: Some("jdoe@example.com".to_string()),
        role: Some("authenticated".to_string()),
    }
}

pub fn auth_context(user_id: Uuid) -> AuthContext {
    AuthContext::from_claims_with_token(&claims_for(user_id), "test-token").unwrap()
}

/// RS256 token signed with the fixture key.
pub fn sign_token(user_id: Uuid) -> String {
    let mut header = Header::new(jsonwebtoken::Algorithm::RS256);
    header.kid = Some(KEY_ID.to_string());
    let key = EncodingKey::from_rsa_pem(SIGNING_KEY.as_bytes()).unwrap();
    encode(&header, &claims_for(user_id), &key).unwrap()
}

/// Serves the fixture key as a JWKS document.
pub fn mock_jwks(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/jwks");
        then.status(200).json_body(serde_json::json!({
            "keys": [{
                "kid": KEY_ID,
                "kty": "RSA",
                "alg": "RS256",
                "use": "sig",
                "n": SIGNING_KEY_MODULUS,
                "e": "AQAB"
            }]
        }));
    });
}

pub fn settings(jwks_url: String) -> Settings {
    Settings {
        env: Environment::Dev,
        server_addr: "127.0.0.1:0".to_string(),
        database_url: "postgres://localhost/unused".to_string(),
        database_max_connections: 1,
        redis_url: "redis://localhost:6379/0".to_string(),
        redis_cache_ttl_seconds: 60,
        cors_allow_origins: vec!["http://localhost:3000".to_string()],
        supabase_jwt_jwks_url: jwks_url,
        supabase_jwt_issuer: ISSUER.to_string(),
        supabase_jwt_audience: AUDIENCE.to_string(),
        jwks_cache_ttl_seconds: 300,
        user_api_url: "http://localhost:8081".parse().unwrap(),
        user_api_timeout_seconds: 1,
        default_lang_key: "en".to_string(),
        form_session_idle_minutes: 30,
    }
}

/// Full router over in-memory gateways, verifying tokens against `jwks`.
pub fn test_app(jwks: &MockServer, users: Arc<InMemoryUsers>) -> axum::Router {
    let settings = settings(jwks.url("/jwks"));
    let jwks_cache = JwksCache::new(
        settings.supabase_jwt_jwks_url.clone(),
        settings.supabase_jwt_issuer.clone(),
        settings.supabase_jwt_audience.clone(),
        settings.jwks_cache_ttl_seconds,
    );
    create_app(AppState::new(settings, jwks_cache, form_service(users)))
}
