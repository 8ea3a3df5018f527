//! `GET /v1/varietals`, `/v1/varietals/{slug}`, `/v1/varietals/{slug}/beans` (§6).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::browse;
use crate::error::Error;
use crate::search::{self, SearchParams};
use crate::server::handlers::search::RawSearchQuery;
use crate::server::state::AppState;

pub async fn list(State(state): State<Arc<AppState>>) -> Response {
    let conn = state.conn.lock().unwrap();
    match browse::varietal_list(&conn) {
        Ok(list) => Json(list).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Slug routing is case-insensitive (§6): the slug is just the canonical
/// name as typed, matched case-insensitively against the stored names.
pub async fn detail(State(state): State<Arc<AppState>>, Path(slug): Path<String>) -> Response {
    let conn = state.conn.lock().unwrap();
    match resolve_canonical_name(&conn, &slug) {
        Ok(Some(name)) => match browse::varietal_detail(&conn, &name) {
            Ok(detail) => Json(detail).into_response(),
            Err(e) => e.into_response(),
        },
        Ok(None) => Error::NotFound(format!("no such varietal: {slug}")).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn beans(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(raw): Query<RawSearchQuery>,
) -> Response {
    let conn = state.conn.lock().unwrap();
    let name = match resolve_canonical_name(&conn, &slug) {
        Ok(Some(name)) => name,
        Ok(None) => return Error::NotFound(format!("no such varietal: {slug}")).into_response(),
        Err(e) => return e.into_response(),
    };

    let mut params: SearchParams = raw.into();
    params.variety = Some(format!("\"{name}\""));

    match search::search(&conn, &params) {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}

fn resolve_canonical_name(
    conn: &rusqlite::Connection,
    slug: &str,
) -> crate::error::Result<Option<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT je.value FROM origins o, json_each(o.variety_canonical) je
         WHERE LOWER(je.value) = LOWER(?1) LIMIT 1",
    )?;
    match stmt.query_row([slug], |row| row.get(0)) {
        Ok(name) => Ok(Some(name)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
