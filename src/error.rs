//! # error
//!
//! Centralised application error type.
//!
//! Every handler returns `Result<_, AppError>`. Axum's `IntoResponse` impl
//! converts these into structured JSON error bodies so the dashboard always
//! gets a machine-readable response even on failure.
//!
//! Trade infeasibility is *not* an error: it comes back as a normal `200`
//! with `allowed: false`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::engine::RiskError;

#[derive(Debug, Error)]
pub enum AppError {
    /// The request payload was syntactically correct but semantically invalid.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A bridge-backed route was called but `MT5_BRIDGE_URL` is not set.
    #[error("MT5 bridge not configured")]
    BridgeUnavailable,

    /// The MT5 bridge failed or returned garbage.
    #[error("MT5 bridge error: {0:#}")]
    Upstream(anyhow::Error),
}

impl From<RiskError> for AppError {
    fn from(err: RiskError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::BridgeUnavailable => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            AppError::Upstream(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
        };

        let body = Json(json!({
            "ok":    false,
            "error": message,
        }));

        (status, body).into_response()
    }
}
