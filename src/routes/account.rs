//! Account routes
//!
//! The general profile form, driven as a server-side session: each call
//! applies one interaction and returns the re-rendered form.

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::{Created, DataResponse, NoContent};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::form::normalize;
use crate::form::{DroppedFile, FieldChange};

/// Multipart field carrying the dropped files.
const AVATAR_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct SelectRegionRequest {
    #[serde(default, deserialize_with = "normalize::blank_as_none_i64")]
    pub region: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLanguageRequest {
    pub lang_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectPhoneCodeRequest {
    /// Dialing code of the picked country; `null` or `""` clears the picker.
    #[serde(default)]
    pub phone_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetPhoneNumberRequest {
    #[serde(default)]
    pub number: Option<String>,
}

/// POST /account/general/session
///
/// Opens the form for the caller, hydrated from their current record.
pub async fn open_session(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.forms.open(&auth).await?;
    Ok(Created(view))
}

/// GET /account/general/session
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.forms.view(&auth)?;
    Ok(Json(DataResponse::new(view)))
}

/// DELETE /account/general/session
pub async fn discard_session(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    state.forms.discard(&auth)?;
    Ok(NoContent)
}

/// PATCH /account/general/session/fields
///
/// Sets one plain field, e.g. `{"field": "email", "value": "a@b.c"}`.
pub async fn set_field(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(change): Json<FieldChange>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.forms.set_field(&auth, change)?;
    Ok(Json(DataResponse::new(view)))
}

/// PUT /account/general/session/region
///
/// Selects a region and recomputes the town list.
pub async fn select_region(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<SelectRegionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.forms.select_region(&auth, req.region)?;
    Ok(Json(DataResponse::new(view)))
}

/// PUT /account/general/session/lang
pub async fn change_language(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<ChangeLanguageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.forms.change_language(&auth, req.lang_key)?;
    Ok(Json(DataResponse::new(view)))
}

/// PUT /account/general/session/phone-numbers/:slot/code
pub async fn select_phone_code(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(slot): Path<usize>,
    Json(req): Json<SelectPhoneCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.forms.select_phone_code(&auth, slot, req.phone_code)?;
    Ok(Json(DataResponse::new(view)))
}

/// PUT /account/general/session/phone-numbers/:slot/number
pub async fn set_phone_number(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(slot): Path<usize>,
    Json(req): Json<SetPhoneNumberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.forms.set_phone_number(&auth, slot, req.number)?;
    Ok(Json(DataResponse::new(view)))
}

/// POST /account/general/session/avatar
///
/// Multipart drop; every `file` part counts as one dropped file.
pub async fn drop_avatar(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to parse multipart: {e}")))?
    {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {e}")))?;

        files.push(DroppedFile::new(file_name, content_type, bytes));
    }

    let view = state.forms.drop_avatar(&auth, files)?;
    Ok(Json(DataResponse::new(view)))
}

/// GET /account/general/session/avatar/preview
///
/// Content of the staged avatar, before it is uploaded anywhere.
pub async fn avatar_preview(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let preview = state.forms.avatar_preview(&auth)?;
    Ok((
        [
            (header::CONTENT_TYPE, preview.content_type),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        preview.bytes,
    ))
}

/// POST /account/general/session/submit
///
/// Validates the whole form and stores the general section.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.forms.submit(&auth).await?;
    Ok(Json(DataResponse::new(outcome)))
}
