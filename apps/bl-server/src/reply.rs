//! Response envelopes.
//!
//! Success bodies are the lab output as is. Errors use the two shapes
//! front-ends already parse: `{"error": "Unsupported chemistry"}` and
//! `["ERROR: <message>"]`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bl_app::AppError;
use serde_json::json;
use tracing::{error, warn};

pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::UnsupportedChemistry { .. }
        | AppError::InvalidParameter(_)
        | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AppError::SolverTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AppError::SolverFailure(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Render `err`; with `legacy_status` every error except an unsupported
/// chemistry is answered with 200.
pub fn error_response(err: &AppError, legacy_status: bool) -> Response {
    let status = status_for(err);
    if status.is_server_error() {
        error!(error = %err, retryable = err.is_retryable(), "request failed");
    } else {
        warn!(error = %err, "request rejected");
    }

    if let AppError::UnsupportedChemistry { .. } = err {
        return (status, Json(json!({"error": "Unsupported chemistry"}))).into_response();
    }
    let status = if legacy_status { StatusCode::OK } else { status };
    (status, Json(json!([format!("ERROR: {err}")]))).into_response()
}

pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!(["ERROR: Not Found"]))).into_response()
}
