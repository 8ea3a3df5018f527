//! `GET /v1/origins/{country}`, `/{country}/{region_slug}`,
//! `/{country}/{region_slug}/{farm_slug}`, and `/v1/origins/search` (§6).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::browse;
use crate::search::SearchParams;
use crate::server::state::AppState;

pub async fn country(State(state): State<Arc<AppState>>, Path(country): Path<String>) -> Response {
    let conn = state.conn.lock().unwrap();
    match browse::country_detail(&conn, &country, &SearchParams::default()) {
        Ok(detail) => Json(detail).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn region(
    State(state): State<Arc<AppState>>,
    Path((country, region_slug)): Path<(String, String)>,
) -> Response {
    let conn = state.conn.lock().unwrap();
    match browse::region_detail(&conn, &country, &region_slug, &SearchParams::default()) {
        Ok(detail) => Json(detail).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn farm(
    State(state): State<Arc<AppState>>,
    Path((country, region_slug, farm_slug)): Path<(String, String, String)>,
) -> Response {
    let conn = state.conn.lock().unwrap();
    match browse::farm_detail(&conn, &country, &region_slug, &farm_slug, &SearchParams::default()) {
        Ok(detail) => Json(detail).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct OriginSearchQuery {
    pub q: String,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OriginSearchQuery>,
) -> Response {
    let conn = state.conn.lock().unwrap();
    match browse::origin_search(&conn, &params.q) {
        Ok(hits) => Json(hits).into_response(),
        Err(e) => e.into_response(),
    }
}
