//! `POST /v1/ai/search` and `POST /v1/ai/search/redirect` (§4.8, §6).

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Deserialize;

use crate::ai;
use crate::ai_cache;
use crate::search::{self, SearchParams};
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AiSearchRequest {
    pub text: String,
}

fn translate_cached(
    conn: &rusqlite::Connection,
    text: &str,
) -> crate::error::Result<SearchParams> {
    if let Some(cached) = ai_cache::get_text::<SearchParams>(conn, text)? {
        return Ok(cached);
    }
    let params = ai::translate(text);
    ai_cache::put_text(conn, text, Some(text), &params)?;
    Ok(params)
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AiSearchRequest>,
) -> Response {
    let conn = state.conn.lock().unwrap();
    let params = match translate_cached(&conn, &body.text) {
        Ok(params) => params,
        Err(e) => return e.into_response(),
    };
    match search::search(&conn, &params) {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Returns the canonical `/v1/search` URL the translated text resolves to,
/// rather than the results themselves, so clients can bookmark or share it.
pub async fn search_redirect(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AiSearchRequest>,
) -> Response {
    let conn = state.conn.lock().unwrap();
    let params = match translate_cached(&conn, &body.text) {
        Ok(params) => params,
        Err(e) => return e.into_response(),
    };
    let location = ai::to_search_query_string(&params);
    Redirect::to(&location).into_response()
}
