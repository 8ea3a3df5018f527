//! Kissaten Query Server (§6): read-mostly HTTP API over the warehouse built
//! by the ingest binary.

mod error_response;
pub mod handlers;
mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use crate::canon::CanonTables;
use crate::config::Config;
use crate::db;
use crate::error::Result;

pub use routes::create_router;
pub use state::AppState;

/// Open the warehouse read-only (unless `config.use_rw_db`) and serve the
/// API on `config.server.bind` until the process is signaled to stop.
pub async fn run_server(config: Config, canon: CanonTables) -> Result<()> {
    let conn = db::open(&config.database_path, !config.use_rw_db, &canon)?;
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .map_err(|e: std::net::AddrParseError| crate::error::Error::Config(e.to_string()))?;

    let state = Arc::new(AppState::new(conn, canon, config));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "kissaten server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
