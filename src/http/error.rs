//! Mapping of bridge errors onto HTTP responses.
//!
//! Body shape is always `{"error": kind, "message": text}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::BridgeError;

/// Error returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    Bridge(BridgeError),
    NotFound(String),
}

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        ApiError::Bridge(e)
    }
}

pub fn status_for(error: &BridgeError) -> StatusCode {
    match error {
        BridgeError::Validation(_) => StatusCode::BAD_REQUEST,
        BridgeError::SettlementConflict(_) => StatusCode::CONFLICT,
        BridgeError::NotInitialized(_)
        | BridgeError::Configuration(_)
        | BridgeError::NoSigningAuthority => StatusCode::SERVICE_UNAVAILABLE,
        BridgeError::ChainMismatch { .. } => StatusCode::PRECONDITION_FAILED,
        BridgeError::Network(_)
        | BridgeError::Wallet(_)
        | BridgeError::BackendDecode(_)
        | BridgeError::MalformedPreparedTx(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::Bridge(e) => {
                let status = status_for(&e);
                if status.is_server_error() {
                    tracing::error!(error = %e, kind = e.kind(), "Request failed");
                } else {
                    tracing::debug!(error = %e, kind = e.kind(), "Request rejected");
                }
                (status, e.kind(), e.to_string())
            }
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, "not_found", what),
        };
        (status, Json(json!({ "error": kind, "message": message }))).into_response()
    }
}
