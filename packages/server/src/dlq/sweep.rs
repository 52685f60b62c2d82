//! Reconciliation of assets and requests that stopped moving: workers that
//! died mid-generation, jobs whose enqueue was lost, and deliveries that
//! failed for individual users.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use common::entity::{asset, video_request};
use common::ledger::{self, FailOutcome};
use common::{AssetStatus, DlqErrorCode, DlqMessageType};
use sea_orm::EntityTrait;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::DlqService;
use crate::ordering::enqueue_generation;
use crate::state::AppState;

/// What one pass of the sweep changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Stuck Generating assets that were failed.
    pub failed: usize,
    /// Pending assets whose lost job was published again.
    pub requeued: usize,
    /// Requests completed by redelivering a cached handle.
    pub redelivered: u64,
}

/// Run the sweep as a background task.
pub async fn run_reconciliation_sweep(state: AppState) {
    let config = state.config.reconcile.clone();
    let scan_interval = Duration::from_secs(config.scan_interval_secs);

    info!(
        timeout_secs = config.stuck_timeout_secs,
        scan_interval_secs = config.scan_interval_secs,
        "Starting reconciliation sweep"
    );

    let mut interval = tokio::time::interval(scan_interval);

    loop {
        interval.tick().await;

        match reconcile_once(&state).await {
            Ok(report) if report != SweepReport::default() => {
                info!(?report, "Reconciliation sweep made progress");
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Reconciliation sweep failed"),
        }
    }
}

/// One pass over stuck generations, lost enqueues and stalled deliveries.
pub async fn reconcile_once(state: &AppState) -> anyhow::Result<SweepReport> {
    let threshold = Utc::now() - state.config.reconcile.stuck_timeout();

    Ok(SweepReport {
        failed: fail_stuck_generations(state, threshold).await?,
        requeued: requeue_lost_jobs(state, threshold).await?,
        redelivered: redeliver_stalled(state, threshold).await?,
    })
}

async fn fail_stuck_generations(
    state: &AppState,
    threshold: chrono::DateTime<Utc>,
) -> anyhow::Result<usize> {
    let stuck = ledger::stale_assets(&state.db, AssetStatus::Generating, threshold).await?;
    let mut failed = 0;

    for found in stuck {
        let asset_id = found.id;
        match ledger::fail_generation(&state.db, asset_id).await {
            Ok(FailOutcome::Failed { requests, .. }) => {
                warn!(%asset_id, waiting = requests.len(), "Failing stuck generation");
                state.fanout.notify_failed(asset_id, &requests).await;
                record_stuck(state, &found).await;
                failed += 1;
            }
            Ok(_) => {}
            Err(e) => error!(%asset_id, error = %e, "Failed to fail stuck generation"),
        }
    }

    Ok(failed)
}

async fn record_stuck(state: &AppState, found: &asset::Model) {
    let payload = serde_json::json!({
        "asset_id": found.id,
        "name": found.name,
        "generation_attempts": found.generation_attempts,
        "updated_at": found.updated_at,
    });

    // One row per stuck epoch: a later stall of the same asset gets its own.
    let message_id = format!(
        "stuck-generation-{}-{}",
        found.id,
        found.updated_at.timestamp_millis()
    );

    if let Err(e) = DlqService::new(&state.db)
        .create_entry(
            message_id,
            DlqMessageType::GenerationJob,
            Some(found.id),
            payload,
            DlqErrorCode::StuckGeneration,
            format!(
                "Asset stuck in Generating for over {} seconds",
                state.config.reconcile.stuck_timeout_secs
            ),
        )
        .await
    {
        error!(asset_id = %found.id, error = %e, "Failed to record stuck generation");
    }
}

async fn requeue_lost_jobs(
    state: &AppState,
    threshold: chrono::DateTime<Utc>,
) -> anyhow::Result<usize> {
    let waiting = ledger::unqueued_assets(&state.db, threshold).await?;
    let mut requeued = 0;

    for found in waiting {
        info!(asset_id = %found.id, "Re-enqueueing generation that never reached the queue");
        if enqueue_generation(state, found.id).await {
            requeued += 1;
        }
    }

    Ok(requeued)
}

async fn redeliver_stalled(
    state: &AppState,
    threshold: chrono::DateTime<Utc>,
) -> anyhow::Result<u64> {
    let stalled = ledger::stalled_requests(&state.db, threshold).await?;

    let mut by_asset: BTreeMap<Uuid, Vec<video_request::Model>> = BTreeMap::new();
    for request in stalled {
        by_asset.entry(request.asset_id).or_default().push(request);
    }

    let mut completed = 0;
    for (asset_id, requests) in by_asset {
        let Some(found) = asset::Entity::find_by_id(asset_id).one(&state.db).await? else {
            continue;
        };
        let (AssetStatus::Available, Some(handle)) = (found.status, found.delivery_handle) else {
            continue;
        };

        let delivered = state.fanout.redeliver(&requests, &handle).await;
        if delivered.len() < requests.len() {
            warn!(
                %asset_id,
                failed = requests.len() - delivered.len(),
                "Some stalled requests still could not be delivered"
            );
        }
        completed += ledger::complete_requests(&state.db, asset_id, &delivered).await?;
    }

    Ok(completed)
}
