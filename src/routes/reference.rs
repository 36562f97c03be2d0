//! Reference data routes
//!
//! Lookups behind the country picker and the town select. Both are public.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::domain::Country;
use crate::error::ApiError;
use crate::form::countries;

#[derive(Debug, Deserialize)]
pub struct CountryQuery {
    #[serde(default)]
    pub q: String,
}

/// Country as offered by the picker.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryOption {
    #[serde(flatten)]
    pub country: Country,
    pub flag: String,
}

impl From<&Country> for CountryOption {
    fn from(country: &Country) -> Self {
        Self {
            flag: country.flag_icon(),
            country: country.clone(),
        }
    }
}

/// GET /countries?q=
///
/// Countries whose names or dialing code contain `q`.
pub async fn search_countries(Query(query): Query<CountryQuery>) -> impl IntoResponse {
    let data: Vec<CountryOption> = countries::search(&query.q)
        .into_iter()
        .map(CountryOption::from)
        .collect();
    Json(DataResponse::new(data))
}

/// GET /regions/:region_id/towns
pub async fn list_towns(
    State(state): State<Arc<AppState>>,
    Path(region_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let towns = state.forms.towns_of_region(region_id).await?;
    Ok(Json(DataResponse::new(towns)))
}

/// GET /regions
pub async fn list_regions(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let regions = state.forms.reference().regions().await?;
    Ok(Json(DataResponse::new(regions)))
}
