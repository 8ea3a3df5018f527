//! `GET /v1/currencies`, `GET /v1/convert`, `POST /v1/currencies/update`,
//! `POST /v1/currencies/refresh` (§6).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::currency::CurrencyService;
use crate::server::state::AppState;

pub async fn list(State(state): State<Arc<AppState>>) -> Response {
    let conn = state.conn.lock().unwrap();
    match CurrencyService::list_currencies(&conn) {
        Ok(rates) => Json(rates).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub amount: f64,
    pub from: String,
    pub to: String,
}

pub async fn convert(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ConvertQuery>,
) -> Response {
    let conn = state.conn.lock().unwrap();
    match CurrencyService::convert(&conn, q.amount, &q.from, &q.to) {
        Ok(converted) => Json(serde_json::json!({ "converted": converted })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Re-fetches the rate table only when the cached table is stale (§4.4).
pub async fn update(State(state): State<Arc<AppState>>) -> Response {
    do_refresh(state, false).await
}

/// Unconditionally re-fetches the rate table, bypassing the staleness check.
pub async fn refresh(State(state): State<Arc<AppState>>) -> Response {
    do_refresh(state, true).await
}

/// Split into fetch (async, no `Connection` held) then store (sync, brief
/// lock) so the warehouse mutex guard never spans the network `.await` —
/// holding a `!Sync` type's reference across an await would make this
/// handler's future `!Send`, which `axum` requires.
async fn do_refresh(state: Arc<AppState>, force: bool) -> Response {
    let should_fetch = {
        let conn = state.conn.lock().unwrap();
        match state.currency.is_fresh(&conn) {
            Ok(fresh) => force || !fresh,
            Err(e) => return e.into_response(),
        }
    };
    if !should_fetch {
        return Json(serde_json::json!({ "rates_updated": 0 })).into_response();
    }

    let body = match state.currency.fetch_rates().await {
        Ok(body) => body,
        Err(e) => return e.into_response(),
    };

    let conn = state.conn.lock().unwrap();
    match CurrencyService::apply_rates(&conn, &body) {
        Ok(count) => Json(serde_json::json!({ "rates_updated": count })).into_response(),
        Err(e) => e.into_response(),
    }
}
