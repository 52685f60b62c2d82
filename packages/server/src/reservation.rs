//! Reservation Engine: decides, in one serializable unit, whether a new
//! order is served from cache, joins an in-flight generation, or becomes
//! the sole generator for its name.

use chrono::{DateTime, Duration, Utc};
use common::database::{DEFAULT_CONFLICT_RETRIES, serializable};
use common::entity::{asset, video_request};
use common::ledger;
use common::{AssetStatus, RequestStatus};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set,
};
use tracing::{debug, instrument};
use uuid::Uuid;

/// What the caller should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    /// Deliver `handle` now. The request is already Completed.
    ServeCached {
        asset_id: Uuid,
        request_id: i32,
        handle: String,
    },
    /// Someone else is generating; the request waits as Pending.
    Subscribed { asset_id: Uuid, request_id: i32 },
    /// This caller owns the generation epoch and must enqueue the job.
    Generate { asset_id: Uuid, request_id: i32 },
}

impl Reservation {
    pub fn asset_id(&self) -> Uuid {
        match self {
            Self::ServeCached { asset_id, .. }
            | Self::Subscribed { asset_id, .. }
            | Self::Generate { asset_id, .. } => *asset_id,
        }
    }

    pub fn request_id(&self) -> i32 {
        match self {
            Self::ServeCached { request_id, .. }
            | Self::Subscribed { request_id, .. }
            | Self::Generate { request_id, .. } => *request_id,
        }
    }
}

/// One order to reserve.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub user_id: i64,
    /// Deduplication key, see [`common::validation::normalize_name`].
    pub name: String,
    /// Name as typed, kept for notices.
    pub child_name: String,
    pub child_age: Option<i32>,
}

/// Decision over the asset row found for a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No asset yet.
    Create,
    ServeCached(String),
    Subscribe,
    /// Failed or expired: start a new epoch.
    Rearm,
}

pub fn decide(existing: Option<&asset::Model>, now: DateTime<Utc>, retention: Duration) -> Decision {
    let Some(found) = existing else {
        return Decision::Create;
    };

    match found.status {
        AssetStatus::Pending | AssetStatus::Generating => Decision::Subscribe,
        AssetStatus::Failed => Decision::Rearm,
        AssetStatus::Available => match found.cached_handle(now, retention) {
            Some(handle) => Decision::ServeCached(handle.to_string()),
            None => Decision::Rearm,
        },
    }
}

#[derive(Clone)]
pub struct ReservationEngine {
    db: DatabaseConnection,
    retention: Duration,
}

impl ReservationEngine {
    pub fn new(db: DatabaseConnection, retention: Duration) -> Self {
        Self { db, retention }
    }

    /// Reserve `order`, re-running the whole unit on serialization conflicts.
    #[instrument(skip(self, order), fields(user_id = order.user_id, name = %order.name))]
    pub async fn reserve(&self, order: &OrderRequest) -> Result<Reservation, DbErr> {
        let retention = self.retention;
        let order = order.clone();

        let reservation = serializable(&self.db, DEFAULT_CONFLICT_RETRIES, |txn| {
            let order = order.clone();
            Box::pin(async move { reserve_in(txn, &order, retention).await })
        })
        .await?;

        debug!(?reservation, "Reservation decided");
        Ok(reservation)
    }
}

async fn reserve_in<C: ConnectionTrait>(
    conn: &C,
    order: &OrderRequest,
    retention: Duration,
) -> Result<Reservation, DbErr> {
    let now = Utc::now();
    let existing = asset::Entity::find()
        .filter(asset::Column::Name.eq(order.name.as_str()))
        .one(conn)
        .await?;

    match (decide(existing.as_ref(), now, retention), existing) {
        (Decision::Create, _) => {
            let created = asset::ActiveModel {
                id: Set(Uuid::now_v7()),
                name: Set(order.name.clone()),
                status: Set(AssetStatus::Pending),
                delivery_handle: Set(None),
                generation_attempts: Set(0),
                created_at: Set(now),
                generated_at: Set(None),
                enqueued_at: Set(None),
                updated_at: Set(now),
            }
            .insert(conn)
            .await?;
            let request_id = insert_request(conn, order, created.id, RequestStatus::Pending, now).await?;
            Ok(Reservation::Generate {
                asset_id: created.id,
                request_id,
            })
        }
        (Decision::ServeCached(handle), Some(found)) => {
            let request_id =
                insert_request(conn, order, found.id, RequestStatus::Completed, now).await?;
            Ok(Reservation::ServeCached {
                asset_id: found.id,
                request_id,
                handle,
            })
        }
        (Decision::Subscribe, Some(found)) => {
            let request_id = insert_request(conn, order, found.id, RequestStatus::Pending, now).await?;
            Ok(Reservation::Subscribed {
                asset_id: found.id,
                request_id,
            })
        }
        (Decision::Rearm, Some(found)) => {
            let rearmed = ledger::rearm(conn, found, now).await?;
            let request_id =
                insert_request(conn, order, rearmed.id, RequestStatus::Pending, now).await?;
            Ok(Reservation::Generate {
                asset_id: rearmed.id,
                request_id,
            })
        }
        (_, None) => Err(DbErr::Custom("reservation decided on a missing asset".into())),
    }
}

async fn insert_request<C: ConnectionTrait>(
    conn: &C,
    order: &OrderRequest,
    asset_id: Uuid,
    status: RequestStatus,
    now: DateTime<Utc>,
) -> Result<i32, DbErr> {
    let inserted = video_request::ActiveModel {
        user_id: Set(order.user_id),
        asset_id: Set(asset_id),
        status: Set(status),
        child_name: Set(order.child_name.clone()),
        child_age: Set(order.child_age),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(inserted.id)
}
