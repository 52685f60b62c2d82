use std::sync::Arc;

use common::DlqEnvelope;
use common::database::{DEFAULT_CONFLICT_RETRIES, serializable};
use common::delivery::Fanout;
use common::ledger::{self, FailOutcome};
use mq::{BrokerMessage, Mq};
use sea_orm::{DatabaseConnection, DbErr};
use tracing::{error, info, warn};

use crate::dlq::DlqService;

/// What the server did with a dead-lettered job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadLetterOutcome {
    pub entry_id: i32,
    /// The server failed the asset because the worker could not.
    pub failed_here: bool,
}

/// Persist `envelope` and, if the worker could not record the failure,
/// fail the asset and notify whoever is still waiting.
///
/// The row and the failure commit together, and only the delivery that
/// creates the row fails the asset. A replay after the user re-armed the
/// asset leaves the new generation alone.
pub async fn record_dead_letter(
    db: &DatabaseConnection,
    fanout: &Fanout,
    envelope: &DlqEnvelope,
) -> Result<DeadLetterOutcome, DbErr> {
    let (stored, failure) = serializable(db, DEFAULT_CONFLICT_RETRIES, |txn| {
        let envelope = envelope.clone();
        Box::pin(async move {
            let stored = DlqService::new(txn).send_to_dlq(&envelope).await?;
            let failure = match (stored.created, envelope.failure_recorded, envelope.asset_id) {
                (true, false, Some(asset_id)) => Some(ledger::fail_in_flight(txn, asset_id).await?),
                _ => None,
            };
            Ok((stored, failure))
        })
    })
    .await?;

    let mut failed_here = false;
    match (failure, envelope.asset_id) {
        (Some(FailOutcome::Failed { requests, .. }), Some(asset_id)) => {
            warn!(%asset_id, waiting = requests.len(), "Recorded failure the worker missed");
            fanout.notify_failed(asset_id, &requests).await;
            failed_here = true;
        }
        (Some(FailOutcome::NotInFlight(found)), Some(asset_id)) => {
            info!(%asset_id, status = %found.status, "Dead-lettered asset already settled");
        }
        (Some(FailOutcome::NotFound), Some(asset_id)) => {
            info!(%asset_id, "Dead-lettered asset no longer exists");
        }
        _ if !stored.created => {
            info!(message_id = %envelope.message_id, "Dead letter already recorded");
        }
        (None, None) if !envelope.failure_recorded => {
            info!(
                message_id = %envelope.message_id,
                "Skipping asset update: asset_id unknown"
            );
        }
        _ => {}
    }

    Ok(DeadLetterOutcome {
        entry_id: stored.entry.id,
        failed_here,
    })
}

pub async fn consume_generation_dlq(
    db: DatabaseConnection,
    fanout: Fanout,
    mq: Arc<Mq>,
    queue_name: String,
) {
    info!(queue = %queue_name, "Starting generation DLQ consumer");

    let result = mq
        .process_messages(
            &queue_name,
            None,
            None,
            move |message: BrokerMessage<DlqEnvelope>| {
                let db = db.clone();
                let fanout = fanout.clone();
                async move {
                    let envelope = message.payload;
                    match record_dead_letter(&db, &fanout, &envelope).await {
                        Ok(outcome) => {
                            info!(
                                asset_id = ?envelope.asset_id,
                                message_id = %envelope.message_id,
                                error_code = %envelope.error_code,
                                entry_id = outcome.entry_id,
                                "Persisted generation DLQ envelope"
                            );
                            Ok(())
                        }
                        Err(e) => {
                            error!(
                                message_id = %envelope.message_id,
                                error = %e,
                                "Failed to persist generation DLQ envelope"
                            );
                            Err(mq::BroccoliError::Job(format!(
                                "DB persistence failed: {}",
                                e
                            )))
                        }
                    }
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Generation DLQ consumer stopped unexpectedly");
    }
}
