//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API that delegates to the option lifecycle use case.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, Query, State},
    http::{StatusCode, request::Parts},
    routing::{get, post, put},
};

use crate::application::dto::{
    ExerciseRequest, LiquidationParams, OptionDto, PremiumQuoteDto, SettlementReceipt,
    TakePublishedRequest, TakeReceipt, TakeRequest,
};
use crate::application::use_cases::{OptionLifecycle, ProtocolParameters};
use crate::domain::commitment::{AmountBounds, SignedCommitment};
use crate::domain::shared::{Amount, AssetId, CommitmentHash, Identity, OptionId};
use crate::error::EngineError;

use super::request::{ListOptionsQuery, QuotePremiumRequest, SafetyMarginRequest, TransferRequest};
use super::response::{
    ApiError, BalanceResponse, CollateralizationResponse, HealthResponse, PublishResponse,
};

/// Header carrying the authenticated caller.
pub const CALLER_HEADER: &str = "x-caller-identity";

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The option lifecycle.
    pub lifecycle: Arc<OptionLifecycle>,
    /// Application version.
    pub version: String,
}

/// The caller, taken from [`CALLER_HEADER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Self(Identity::new(value)))
            .ok_or_else(|| {
                ApiError(EngineError::Unauthorized {
                    message: format!("missing {CALLER_HEADER} header"),
                })
            })
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/commitments", post(publish_commitment).get(list_commitments))
        .route("/api/v1/commitments/quote", post(quote_premium))
        .route("/api/v1/commitments/{hash}", get(get_commitment))
        .route("/api/v1/commitments/{hash}/take", post(take_published))
        .route("/api/v1/options", post(take).get(list_options))
        .route("/api/v1/options/{id}", get(get_option))
        .route("/api/v1/options/{id}/exercise", post(exercise))
        .route("/api/v1/options/{id}/liquidate", post(liquidate))
        .route("/api/v1/collateralization/{asset}", get(collateralization))
        .route("/api/v1/accounts/deposit", post(deposit))
        .route("/api/v1/accounts/withdraw", post(withdraw))
        .route("/api/v1/accounts/{owner}/balances/{asset}", get(balance))
        .route("/api/v1/admin/parameters", get(parameters))
        .route("/api/v1/admin/pause", post(pause))
        .route("/api/v1/admin/unpause", post(unpause))
        .route("/api/v1/admin/safety-margin", put(set_safety_margin))
        .route("/api/v1/admin/assets/{asset}/bounds", put(set_asset_bounds))
        .route("/api/v1/admin/revenue/{asset}", get(protocol_revenue))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        paused: state.lifecycle.parameters().paused,
    })
}

// ============================================================================
// Commitment book
// ============================================================================

async fn publish_commitment(
    State(state): State<AppState>,
    Json(signed): Json<SignedCommitment>,
) -> Result<(StatusCode, Json<PublishResponse>), ApiError> {
    let hash = state.lifecycle.publish_commitment(signed).await?;
    Ok((StatusCode::CREATED, Json(PublishResponse { hash })))
}

async fn list_commitments(State(state): State<AppState>) -> ApiResult<Vec<SignedCommitment>> {
    let commitments = state.lifecycle.list_commitments().await?;
    Ok(Json(commitments.into_iter().map(|(_, signed)| signed).collect()))
}

async fn get_commitment(
    State(state): State<AppState>,
    Path(hash): Path<CommitmentHash>,
) -> ApiResult<SignedCommitment> {
    Ok(Json(state.lifecycle.get_commitment(&hash).await?))
}

async fn quote_premium(
    State(state): State<AppState>,
    Json(request): Json<QuotePremiumRequest>,
) -> ApiResult<PremiumQuoteDto> {
    let quote = state
        .lifecycle
        .quote_premium(&request.commitment, request.duration_days)
        .await?;
    Ok(Json(quote))
}

async fn take_published(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path(hash): Path<CommitmentHash>,
    Json(request): Json<TakePublishedRequest>,
) -> Result<(StatusCode, Json<TakeReceipt>), ApiError> {
    let receipt = state.lifecycle.take_published(&caller, &hash, request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

// ============================================================================
// Options
// ============================================================================

async fn take(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Json(request): Json<TakeRequest>,
) -> Result<(StatusCode, Json<TakeReceipt>), ApiError> {
    let receipt = state.lifecycle.take(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn list_options(
    State(state): State<AppState>,
    Query(query): Query<ListOptionsQuery>,
) -> ApiResult<Vec<OptionDto>> {
    Ok(Json(state.lifecycle.list_options(query.state).await?))
}

async fn get_option(State(state): State<AppState>, Path(id): Path<OptionId>) -> ApiResult<OptionDto> {
    Ok(Json(state.lifecycle.get_option(id).await?))
}

async fn exercise(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<OptionId>,
    Json(request): Json<ExerciseRequest>,
) -> ApiResult<SettlementReceipt> {
    Ok(Json(state.lifecycle.exercise(&caller, id, request).await?))
}

async fn liquidate(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<OptionId>,
    Json(params): Json<LiquidationParams>,
) -> ApiResult<SettlementReceipt> {
    Ok(Json(state.lifecycle.liquidate_expired(&caller, id, params).await?))
}

async fn collateralization(
    State(state): State<AppState>,
    Path(asset): Path<AssetId>,
) -> ApiResult<CollateralizationResponse> {
    let total_locked = state.lifecycle.check_collateralization(&asset).await?;
    Ok(Json(CollateralizationResponse { asset, total_locked }))
}

// ============================================================================
// Accounts
// ============================================================================

async fn deposit(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Json(request): Json<TransferRequest>,
) -> ApiResult<BalanceResponse> {
    let balance = state.lifecycle.deposit(&caller, &request.asset, request.amount)?;
    Ok(Json(BalanceResponse {
        owner: caller,
        asset: request.asset,
        balance,
    }))
}

async fn withdraw(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Json(request): Json<TransferRequest>,
) -> ApiResult<BalanceResponse> {
    let balance = state.lifecycle.withdraw(&caller, &request.asset, request.amount)?;
    Ok(Json(BalanceResponse {
        owner: caller,
        asset: request.asset,
        balance,
    }))
}

async fn balance(
    State(state): State<AppState>,
    Path((owner, asset)): Path<(Identity, AssetId)>,
) -> Json<BalanceResponse> {
    let balance = state.lifecycle.balance(&owner, &asset);
    Json(BalanceResponse {
        owner,
        asset,
        balance,
    })
}

// ============================================================================
// Administration
// ============================================================================

async fn parameters(State(state): State<AppState>) -> Json<ProtocolParameters> {
    Json(state.lifecycle.parameters())
}

async fn pause(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
) -> Result<StatusCode, ApiError> {
    state.lifecycle.pause(&caller)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unpause(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
) -> Result<StatusCode, ApiError> {
    state.lifecycle.unpause(&caller)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_safety_margin(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Json(request): Json<SafetyMarginRequest>,
) -> Result<StatusCode, ApiError> {
    state.lifecycle.set_safety_margin(&caller, request.bps)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_asset_bounds(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path(asset): Path<AssetId>,
    Json(bounds): Json<AmountBounds>,
) -> Result<StatusCode, ApiError> {
    state.lifecycle.set_asset_bounds(&caller, asset, bounds)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn protocol_revenue(
    State(state): State<AppState>,
    Path(asset): Path<AssetId>,
) -> Json<BalanceResponse> {
    let balance: Amount = state.lifecycle.protocol_revenue(&asset);
    Json(BalanceResponse {
        owner: state.lifecycle.protocol_account().clone(),
        asset,
        balance,
    })
}
