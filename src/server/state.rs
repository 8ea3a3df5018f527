//! Shared application state handed to every handler via `axum::State`.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::canon::CanonTables;
use crate::config::Config;
use crate::currency::CurrencyService;

/// The warehouse connection is a single physical resource (§5): reads are
/// logically concurrent but this process serializes access through the
/// mutex rather than pooling per-request connections.
pub struct AppState {
    pub conn: Mutex<Connection>,
    pub currency: CurrencyService,
    pub canon: CanonTables,
    pub config: Config,
}

impl AppState {
    pub fn new(conn: Connection, canon: CanonTables, config: Config) -> Self {
        let currency = CurrencyService::new(&config.currency);
        Self {
            conn: Mutex::new(conn),
            currency,
            canon,
            config,
        }
    }
}

pub type SharedState = Arc<AppState>;
