//! Crate-wide error type.
//!
//! Individual modules that need their own error vocabulary (the query
//! compiler, the ledger) define a local `thiserror` enum and convert into
//! this one at the module boundary.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("query compile error: {0}")]
    QueryCompile(#[from] crate::query::CompileError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream provider unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("schema could not be initialized: {0}")]
    IngestFatal(String),
}

impl Error {
    /// Exit code for CLI wrappers: 2 for configuration errors, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 2,
            _ => 1,
        }
    }
}
