//! The user-facing "try again" action attached to failure notices.

use common::AssetStatus;
use common::delivery::Notice;
use common::entity::video_request;
use common::ledger::{self, RearmOutcome};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::AppError;
use crate::ordering::enqueue_generation;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RetryOutcome {
    /// The failed asset was re-armed and a new job queued.
    Requeued,
    /// The video exists and was sent again by handle.
    AlreadyAvailable,
    /// Generation is still pending or running.
    InProgress,
}

impl RetryOutcome {
    pub fn notice(self) -> Notice {
        match self {
            Self::Requeued => Notice::Requeued,
            Self::AlreadyAvailable => Notice::AlreadyAvailable,
            Self::InProgress => Notice::StillGenerating,
        }
    }
}

/// Retry generation of `asset_id` for `user_id`. Only Failed assets change.
#[instrument(skip(state))]
pub async fn retry_asset(
    state: &AppState,
    asset_id: Uuid,
    user_id: i64,
) -> Result<RetryOutcome, AppError> {
    match ledger::rearm_failed(&state.db, asset_id).await? {
        RearmOutcome::NotFound => Err(AppError::NotFound(format!("Asset {asset_id} not found"))),
        RearmOutcome::Rearmed(_) => {
            info!("Failed asset re-armed by user");
            enqueue_generation(state, asset_id).await;
            Ok(RetryOutcome::Requeued)
        }
        RearmOutcome::Unchanged(found) => match (found.status, found.delivery_handle) {
            (AssetStatus::Available, Some(handle)) => {
                let child_name = latest_child_name(state, asset_id, user_id)
                    .await?
                    .unwrap_or(found.name);
                state
                    .fanout
                    .deliver_cached(user_id, &child_name, &handle)
                    .await;
                Ok(RetryOutcome::AlreadyAvailable)
            }
            _ => Ok(RetryOutcome::InProgress),
        },
    }
}

/// The name as this user typed it, for the "ready" notice.
async fn latest_child_name(
    state: &AppState,
    asset_id: Uuid,
    user_id: i64,
) -> Result<Option<String>, AppError> {
    let request = video_request::Entity::find()
        .filter(video_request::Column::AssetId.eq(asset_id))
        .filter(video_request::Column::UserId.eq(user_id))
        .order_by_desc(video_request::Column::CreatedAt)
        .one(&state.db)
        .await?;
    Ok(request.map(|r| r.child_name))
}
