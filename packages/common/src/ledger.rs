//! Asset and request state transitions shared by the server and the worker.
//!
//! Every multi-row transition runs through [`serializable`], so concurrent
//! reservations, generation jobs and the reconciliation sweep observe each
//! other's writes in a single serial order.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::database::{DEFAULT_CONFLICT_RETRIES, serializable};
use crate::entity::{asset, video_request};
use crate::status::{AssetStatus, RequestStatus};

/// Result of opening a generation attempt for an asset.
#[derive(Debug, Clone)]
pub enum GenerationStart {
    /// The asset is now Generating; `pending` is the fresh subscriber snapshot.
    Started {
        asset: asset::Model,
        pending: Vec<video_request::Model>,
    },
    /// A previous run already captured the handle; only fan-out remains.
    Resume {
        asset: asset::Model,
        handle: String,
        pending: Vec<video_request::Model>,
    },
    /// Nobody is waiting. Without a handle the asset cannot be Available, so
    /// it was settled as Failed without generating.
    NoSubscribers(asset::Model),
    /// The asset already failed; this job is a stale duplicate.
    Stale(asset::Model),
    NotFound,
}

/// Result of the terminal failure transition.
#[derive(Debug, Clone)]
pub enum FailOutcome {
    /// Asset and its pending requests are now Failed.
    Failed {
        asset: asset::Model,
        requests: Vec<video_request::Model>,
    },
    /// The asset was not in flight; nothing changed.
    NotInFlight(asset::Model),
    NotFound,
}

/// Result of re-arming an asset for another generation epoch.
#[derive(Debug, Clone)]
pub enum RearmOutcome {
    Rearmed(asset::Model),
    /// Only Failed assets can be re-armed.
    Unchanged(asset::Model),
    NotFound,
}

/// All requests still waiting for `asset_id`, oldest first.
pub async fn pending_requests<C: ConnectionTrait>(
    conn: &C,
    asset_id: Uuid,
) -> Result<Vec<video_request::Model>, DbErr> {
    video_request::Entity::find()
        .filter(video_request::Column::AssetId.eq(asset_id))
        .filter(video_request::Column::Status.eq(RequestStatus::Pending))
        .order_by_asc(video_request::Column::CreatedAt)
        .order_by_asc(video_request::Column::Id)
        .all(conn)
        .await
}

/// Mark the asset Generating and snapshot its pending requests in one unit.
///
/// Safe to repeat: a redelivered job re-marks Generating and re-reads the
/// pending set, so requests completed by an earlier run are never revisited.
pub async fn begin_generation(
    db: &DatabaseConnection,
    asset_id: Uuid,
) -> Result<GenerationStart, DbErr> {
    serializable(db, DEFAULT_CONFLICT_RETRIES, |txn| {
        Box::pin(async move {
            let Some(found) = asset::Entity::find_by_id(asset_id).one(txn).await? else {
                return Ok(GenerationStart::NotFound);
            };

            match (found.status, found.delivery_handle.clone()) {
                (AssetStatus::Failed, _) => Ok(GenerationStart::Stale(found)),
                (AssetStatus::Available, Some(handle)) => {
                    let pending = pending_requests(txn, asset_id).await?;
                    Ok(GenerationStart::Resume {
                        asset: found,
                        handle,
                        pending,
                    })
                }
                _ => {
                    let pending = pending_requests(txn, asset_id).await?;
                    let now = Utc::now();

                    if pending.is_empty() {
                        // Without a handle the asset cannot become Available.
                        let mut active: asset::ActiveModel = found.into();
                        active.status = Set(AssetStatus::Failed);
                        active.delivery_handle = Set(None);
                        active.updated_at = Set(now);
                        let settled = active.update(txn).await?;
                        return Ok(GenerationStart::NoSubscribers(settled));
                    }

                    let attempts = found.generation_attempts + 1;
                    let mut active: asset::ActiveModel = found.into();
                    active.status = Set(AssetStatus::Generating);
                    active.delivery_handle = Set(None);
                    active.generation_attempts = Set(attempts);
                    active.updated_at = Set(now);
                    let updated = active.update(txn).await?;

                    Ok(GenerationStart::Started {
                        asset: updated,
                        pending,
                    })
                }
            }
        })
    })
    .await
}

/// Persist the captured handle, flip the asset to Available and return every
/// request still pending at that instant.
///
/// Requests that subscribed after the job's first snapshot are included, so
/// nobody who reserved before the handle became visible is left behind.
pub async fn publish_handle(
    db: &DatabaseConnection,
    asset_id: Uuid,
    handle: &str,
) -> Result<Vec<video_request::Model>, DbErr> {
    let handle = handle.to_owned();
    serializable(db, DEFAULT_CONFLICT_RETRIES, |txn| {
        let handle = handle.clone();
        Box::pin(async move {
            let now = Utc::now();
            let result = asset::Entity::update_many()
                .col_expr(asset::Column::Status, Expr::value(AssetStatus::Available))
                .col_expr(asset::Column::DeliveryHandle, Expr::value(Some(handle)))
                .col_expr(asset::Column::GeneratedAt, Expr::value(Some(now)))
                .col_expr(asset::Column::UpdatedAt, Expr::value(now))
                .filter(asset::Column::Id.eq(asset_id))
                .exec(txn)
                .await?;

            if result.rows_affected == 0 {
                return Err(DbErr::RecordNotFound(format!("video_asset {asset_id}")));
            }

            pending_requests(txn, asset_id).await
        })
    })
    .await
}

/// Mark exactly `request_ids` Completed, scoped to `asset_id`.
pub async fn complete_requests<C: ConnectionTrait>(
    conn: &C,
    asset_id: Uuid,
    request_ids: &[i32],
) -> Result<u64, DbErr> {
    if request_ids.is_empty() {
        return Ok(0);
    }

    let result = video_request::Entity::update_many()
        .col_expr(
            video_request::Column::Status,
            Expr::value(RequestStatus::Completed),
        )
        .col_expr(video_request::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(video_request::Column::AssetId.eq(asset_id))
        .filter(video_request::Column::Id.is_in(request_ids.to_vec()))
        .filter(video_request::Column::Status.eq(RequestStatus::Pending))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}

/// Terminal failure: asset and every still-pending request become Failed.
///
/// Only in-flight assets are failed, so a late failure never discards a
/// handle that was already published.
pub async fn fail_generation(
    db: &DatabaseConnection,
    asset_id: Uuid,
) -> Result<FailOutcome, DbErr> {
    serializable(db, DEFAULT_CONFLICT_RETRIES, |txn| {
        Box::pin(async move { fail_in_flight(txn, asset_id).await })
    })
    .await
}

/// [`fail_generation`] inside the caller's transaction.
pub async fn fail_in_flight<C: ConnectionTrait>(
    conn: &C,
    asset_id: Uuid,
) -> Result<FailOutcome, DbErr> {
    let Some(found) = asset::Entity::find_by_id(asset_id).one(conn).await? else {
        return Ok(FailOutcome::NotFound);
    };

    if !found.status.is_in_flight() {
        return Ok(FailOutcome::NotInFlight(found));
    }

    let now = Utc::now();
    let mut active: asset::ActiveModel = found.into();
    active.status = Set(AssetStatus::Failed);
    active.delivery_handle = Set(None);
    active.updated_at = Set(now);
    let failed = active.update(conn).await?;

    let requests = pending_requests(conn, asset_id).await?;
    video_request::Entity::update_many()
        .col_expr(video_request::Column::Status, Expr::value(RequestStatus::Failed))
        .col_expr(video_request::Column::UpdatedAt, Expr::value(now))
        .filter(video_request::Column::AssetId.eq(asset_id))
        .filter(video_request::Column::Status.eq(RequestStatus::Pending))
        .exec(conn)
        .await?;

    Ok(FailOutcome::Failed {
        asset: failed,
        requests,
    })
}

/// Reset a Failed asset to Pending for a new epoch and put its failed
/// requests back in the queue.
pub async fn rearm_failed(
    db: &DatabaseConnection,
    asset_id: Uuid,
) -> Result<RearmOutcome, DbErr> {
    serializable(db, DEFAULT_CONFLICT_RETRIES, |txn| {
        Box::pin(async move {
            let Some(found) = asset::Entity::find_by_id(asset_id).one(txn).await? else {
                return Ok(RearmOutcome::NotFound);
            };

            if found.status != AssetStatus::Failed {
                return Ok(RearmOutcome::Unchanged(found));
            }

            let now = Utc::now();
            let rearmed = rearm(txn, found, now).await?;

            video_request::Entity::update_many()
                .col_expr(video_request::Column::Status, Expr::value(RequestStatus::Pending))
                .col_expr(video_request::Column::UpdatedAt, Expr::value(now))
                .filter(video_request::Column::AssetId.eq(asset_id))
                .filter(video_request::Column::Status.eq(RequestStatus::Failed))
                .exec(txn)
                .await?;

            Ok(RearmOutcome::Rearmed(rearmed))
        })
    })
    .await
}

/// Start a new generation epoch for `found` inside the caller's transaction.
pub async fn rearm<C: ConnectionTrait>(
    conn: &C,
    found: asset::Model,
    now: DateTime<Utc>,
) -> Result<asset::Model, DbErr> {
    let mut active: asset::ActiveModel = found.into();
    active.status = Set(AssetStatus::Pending);
    active.delivery_handle = Set(None);
    active.generation_attempts = Set(0);
    active.generated_at = Set(None);
    active.enqueued_at = Set(None);
    active.updated_at = Set(now);
    active.update(conn).await
}

/// Record that the queue accepted a job for a Pending asset.
///
/// Assets already picked up by a worker are left as they are.
pub async fn mark_enqueued<C: ConnectionTrait>(conn: &C, asset_id: Uuid) -> Result<bool, DbErr> {
    let result = asset::Entity::update_many()
        .col_expr(asset::Column::EnqueuedAt, Expr::value(Utc::now()))
        .filter(asset::Column::Id.eq(asset_id))
        .filter(asset::Column::Status.eq(AssetStatus::Pending))
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Pending assets idle since `older_than` whose job never reached the queue.
pub async fn unqueued_assets<C: ConnectionTrait>(
    conn: &C,
    older_than: DateTime<Utc>,
) -> Result<Vec<asset::Model>, DbErr> {
    asset::Entity::find()
        .filter(asset::Column::Status.eq(AssetStatus::Pending))
        .filter(asset::Column::EnqueuedAt.is_null())
        .filter(asset::Column::UpdatedAt.lt(older_than))
        .order_by_asc(asset::Column::UpdatedAt)
        .all(conn)
        .await
}

/// Assets in `status` that have not changed since `older_than`.
pub async fn stale_assets<C: ConnectionTrait>(
    conn: &C,
    status: AssetStatus,
    older_than: DateTime<Utc>,
) -> Result<Vec<asset::Model>, DbErr> {
    asset::Entity::find()
        .filter(asset::Column::Status.eq(status))
        .filter(asset::Column::UpdatedAt.lt(older_than))
        .order_by_asc(asset::Column::UpdatedAt)
        .all(conn)
        .await
}

/// Pending requests created before `older_than`, oldest first.
pub async fn stalled_requests<C: ConnectionTrait>(
    conn: &C,
    older_than: DateTime<Utc>,
) -> Result<Vec<video_request::Model>, DbErr> {
    video_request::Entity::find()
        .filter(video_request::Column::Status.eq(RequestStatus::Pending))
        .filter(video_request::Column::CreatedAt.lt(older_than))
        .order_by_asc(video_request::Column::CreatedAt)
        .all(conn)
        .await
}
