//! `GET /v1/tasting-note-categories` (§6).

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::browse;
use crate::server::state::AppState;

pub async fn list(State(state): State<Arc<AppState>>) -> Response {
    let conn = state.conn.lock().unwrap();
    match browse::tasting_note_categories(&conn) {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => e.into_response(),
    }
}
