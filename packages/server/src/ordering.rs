//! Order placement: validate, reserve, then serve, subscribe or enqueue.

use common::GenerationJob;
use common::ledger;
use common::delivery::Notice;
use common::validation::{AgeError, MAX_CHILD_AGE, MIN_CHILD_AGE, NameError, normalize_name};
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::reservation::{OrderRequest, Reservation, ReservationEngine};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Name(#[from] NameError),
    #[error(transparent)]
    Age(#[from] AgeError),
    #[error("Failed to record order: {0}")]
    Db(#[from] DbErr),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Name(e) => e.into(),
            OrderError::Age(e) => e.into(),
            OrderError::Db(e) => e.into(),
        }
    }
}

/// How an order was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// The cached video was sent right away.
    Cached,
    /// Waiting on a generation someone else started.
    Subscribed,
    /// A new generation job was queued for this order.
    Queued,
}

#[derive(Debug, Clone)]
pub struct OrderOutcome {
    pub status: OrderStatus,
    pub asset_id: Uuid,
    pub request_id: i32,
    /// Whether the cached video reached the user. Always false otherwise.
    pub delivered: bool,
}

impl OrderOutcome {
    /// Text for the user, when the outcome warrants a direct reply.
    ///
    /// Cached deliveries already ended with the "ready" notice.
    pub fn reply(&self) -> Option<Notice> {
        match self.status {
            OrderStatus::Cached => None,
            OrderStatus::Subscribed => Some(Notice::Subscribed),
            OrderStatus::Queued => Some(Notice::Queued),
        }
    }
}

/// Place an order for `child_name` on behalf of `user_id`.
#[instrument(skip(state))]
pub async fn place_order(
    state: &AppState,
    user_id: i64,
    child_name: &str,
    child_age: Option<i32>,
) -> Result<OrderOutcome, OrderError> {
    let child_name = state.validator.validate(child_name)?;
    if let Some(age) = child_age
        && !(MIN_CHILD_AGE..=MAX_CHILD_AGE).contains(&age)
    {
        return Err(AgeError.into());
    }

    let engine = ReservationEngine::new(state.db.clone(), state.config.cache.retention());
    let reservation = engine
        .reserve(&OrderRequest {
            user_id,
            name: normalize_name(child_name),
            child_name: child_name.to_string(),
            child_age,
        })
        .await?;

    let asset_id = reservation.asset_id();
    let request_id = reservation.request_id();

    let (status, delivered) = match reservation {
        Reservation::ServeCached { handle, .. } => {
            info!(%asset_id, "Serving cached video");
            let delivered = state
                .fanout
                .deliver_cached(user_id, child_name, &handle)
                .await;
            (OrderStatus::Cached, delivered)
        }
        Reservation::Subscribed { .. } => {
            info!(%asset_id, "Subscribed to in-flight generation");
            (OrderStatus::Subscribed, false)
        }
        Reservation::Generate { .. } => {
            enqueue_generation(state, asset_id).await;
            (OrderStatus::Queued, false)
        }
    };

    Ok(OrderOutcome {
        status,
        asset_id,
        request_id,
        delivered,
    })
}

/// Publish a generation job and record that the queue holds it.
///
/// A failed publish leaves the asset Pending without an enqueue mark, which
/// is what the reconciliation sweep looks for.
pub async fn enqueue_generation(state: &AppState, asset_id: Uuid) -> bool {
    let job = GenerationJob::new(asset_id);
    match mq::enqueue_message(state.queue.as_ref(), &state.config.mq.queue_name, &job).await {
        Ok(job_id) => {
            info!(%asset_id, job_id = %job_id, "Generation job queued");
            if let Err(e) = ledger::mark_enqueued(&state.db, asset_id).await {
                // Unmarked, the asset is published again by the sweep.
                warn!(%asset_id, error = %e, "Failed to record enqueue");
            }
            true
        }
        Err(e) => {
            warn!(%asset_id, error = %e, "Failed to enqueue generation job, leaving it to the sweep");
            false
        }
    }
}
