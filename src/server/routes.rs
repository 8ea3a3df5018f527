//! Axum router configuration for the Kissaten query server (§6).

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};

use crate::server::handlers::{ai, currencies, origins, search, tasting_notes, varietals};
use crate::server::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/v1/search", get(search::search))
        .route("/v1/search/by-paths", post(search::search_by_paths))
        .route("/v1/varietals", get(varietals::list))
        .route("/v1/varietals/:slug", get(varietals::detail))
        .route("/v1/varietals/:slug/beans", get(varietals::beans))
        .route("/v1/origins/search", get(origins::search))
        .route("/v1/origins/:country", get(origins::country))
        .route("/v1/origins/:country/:region_slug", get(origins::region))
        .route(
            "/v1/origins/:country/:region_slug/:farm_slug",
            get(origins::farm),
        )
        .route(
            "/v1/tasting-note-categories",
            get(tasting_notes::list),
        )
        .route("/v1/currencies", get(currencies::list))
        .route("/v1/convert", get(currencies::convert))
        .route("/v1/currencies/update", post(currencies::update))
        .route("/v1/currencies/refresh", post(currencies::refresh))
        .route("/v1/ai/search", post(ai::search))
        .route("/v1/ai/search/redirect", post(ai::search_redirect))
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
