//! `GET /v1/search` and `POST /v1/search/by-paths` (§6).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::error::Error;
use crate::search::{self, SearchParams};
use crate::server::state::AppState;

/// Mirrors [`SearchParams`] but accepts multi-select fields as a single
/// comma-separated query parameter (`roaster=sey,onyx`), since `axum`'s
/// `Query` extractor (backed by `serde_urlencoded`) has no native support
/// for repeated-key arrays without an extra crate.
#[derive(Debug, Deserialize)]
pub struct RawSearchQuery {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub tasting_notes_query: Option<String>,
    #[serde(default)]
    pub tasting_notes_only: bool,
    #[serde(default)]
    pub roaster: Option<String>,
    #[serde(default)]
    pub roaster_location: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub variety: Option<String>,
    #[serde(default)]
    pub process: Option<String>,
    #[serde(default)]
    pub roast_level: Option<String>,
    #[serde(default)]
    pub roast_profile: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub producer: Option<String>,
    #[serde(default)]
    pub farm: Option<String>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub min_weight: Option<i64>,
    #[serde(default)]
    pub max_weight: Option<i64>,
    #[serde(default)]
    pub min_elevation: Option<i64>,
    #[serde(default)]
    pub max_elevation: Option<i64>,
    #[serde(default)]
    pub in_stock_only: bool,
    #[serde(default)]
    pub is_decaf: Option<bool>,
    #[serde(default)]
    pub is_single_origin: Option<bool>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    #[serde(default)]
    pub convert_to_currency: Option<String>,
}

fn split_comma(value: Option<String>) -> Vec<String> {
    value
        .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

impl From<RawSearchQuery> for SearchParams {
    fn from(raw: RawSearchQuery) -> Self {
        SearchParams {
            query: raw.query,
            tasting_notes_query: raw.tasting_notes_query,
            tasting_notes_only: raw.tasting_notes_only,
            roaster: split_comma(raw.roaster),
            roaster_location: split_comma(raw.roaster_location),
            origin: split_comma(raw.origin),
            variety: raw.variety,
            process: raw.process,
            roast_level: raw.roast_level,
            roast_profile: raw.roast_profile,
            region: raw.region,
            producer: raw.producer,
            farm: raw.farm,
            min_price: raw.min_price,
            max_price: raw.max_price,
            min_weight: raw.min_weight,
            max_weight: raw.max_weight,
            min_elevation: raw.min_elevation,
            max_elevation: raw.max_elevation,
            in_stock_only: raw.in_stock_only,
            is_decaf: raw.is_decaf,
            is_single_origin: raw.is_single_origin,
            sort_by: raw.sort_by,
            sort_order: raw.sort_order,
            page: raw.page.unwrap_or(1),
            per_page: raw.per_page.unwrap_or(20),
            convert_to_currency: raw.convert_to_currency,
        }
    }
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(raw): Query<RawSearchQuery>,
) -> Response {
    handle(state, raw.into()).await
}

/// `POST /v1/search/by-paths`: the same filters and currency conversion as
/// `GET /v1/search`, scoped to a fixed set of `bean_url_path` values, sent
/// as an ordinary JSON body (so multi-select fields are native JSON arrays
/// and need no comma-splitting, unlike the query-string variant above).
pub async fn search_by_paths(
    State(state): State<Arc<AppState>>,
    Json(mut params): Json<SearchParams>,
) -> Response {
    if params.bean_url_paths.is_empty() || params.bean_url_paths.len() > 100 {
        return Error::Validation("bean_url_paths must contain 1..=100 entries".to_string())
            .into_response();
    }
    // by-paths requests never paginate away matches the caller explicitly asked for.
    params.per_page = params.per_page.max(params.bean_url_paths.len() as i64).min(100);

    handle(state, params).await
}

async fn handle(state: Arc<AppState>, params: SearchParams) -> Response {
    let conn = state.conn.lock().unwrap();
    match search::search(&conn, &params) {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}
