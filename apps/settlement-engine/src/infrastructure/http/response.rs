//! HTTP response DTOs.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::domain::shared::{Amount, AssetId, CommitmentHash, Identity};
use crate::error::{EngineError, ErrorCode};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Whether takes are paused.
    pub paused: bool,
}

/// Error body for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code.
    pub code: ErrorCode,
    /// Human-readable details.
    pub message: String,
}

/// A published commitment's hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResponse {
    /// Commitment hash.
    pub hash: CommitmentHash,
}

/// A free balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// Account.
    pub owner: Identity,
    /// Asset.
    pub asset: AssetId,
    /// Free balance.
    pub balance: Amount,
}

/// Collateralization check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralizationResponse {
    /// Asset checked.
    pub asset: AssetId,
    /// Locked notional, equal to the TAKEN total.
    pub total_locked: Amount,
}

/// An engine error rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status =
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse {
            code,
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
