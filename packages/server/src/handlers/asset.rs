use axum::{
    Json,
    extract::{Path, State},
};
use common::entity::asset;
use sea_orm::EntityTrait;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::AppJson;
use crate::models::asset::{AssetResponse, RetryAssetRequest, RetryAssetResponse};
use crate::retry_trigger::retry_asset;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/assets/{asset_id}",
    tag = "Assets",
    operation_id = "getAsset",
    summary = "Get asset status",
    params(("asset_id" = Uuid, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Asset", body = AssetResponse),
        (status = 404, description = "Asset not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_asset(
    State(state): State<AppState>,
    Path(asset_id): Path<Uuid>,
) -> Result<Json<AssetResponse>, AppError> {
    let found = asset::Entity::find_by_id(asset_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Asset {asset_id} not found")))?;

    Ok(Json(found.into()))
}

/// Retry a failed generation.
#[utoipa::path(
    post,
    path = "/assets/{asset_id}/retry",
    tag = "Assets",
    operation_id = "retryAsset",
    summary = "Retry a failed generation",
    description = "Backs the \"try again\" button of failure notices. Failed assets are re-armed \
                   and queued; available ones are sent again; in-flight ones are left alone.",
    params(("asset_id" = Uuid, Path, description = "Asset ID")),
    request_body = RetryAssetRequest,
    responses(
        (status = 200, description = "Retry handled", body = RetryAssetResponse),
        (status = 404, description = "Asset not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(user_id = payload.user_id))]
pub async fn retry_generation(
    State(state): State<AppState>,
    Path(asset_id): Path<Uuid>,
    AppJson(payload): AppJson<RetryAssetRequest>,
) -> Result<Json<RetryAssetResponse>, AppError> {
    let outcome = retry_asset(&state, asset_id, payload.user_id).await?;
    Ok(Json(outcome.into()))
}
