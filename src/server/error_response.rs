//! Maps [`crate::error::Error`] onto HTTP status codes per §7.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::error::Error;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::QueryCompile(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) | Error::IngestFatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(_) | Error::Io(_) | Error::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Client-facing messages for everything else; internal-failure
        // variants log their detail and return a generic message instead
        // of leaking storage/IO internals to the caller (§7).
        let message = match &self {
            Error::Validation(msg) => msg.clone(),
            Error::QueryCompile(e) => e.to_string(),
            Error::NotFound(msg) => msg.clone(),
            Error::UpstreamUnavailable(msg) => msg.clone(),
            Error::Config(_) | Error::IngestFatal(_) | Error::Database(_) | Error::Io(_) | Error::Json(_) => {
                error!(error = %self, "internal error serving request");
                "internal server error".to_string()
            }
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
