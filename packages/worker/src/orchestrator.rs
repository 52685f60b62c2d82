//! Generation Orchestrator: runs one generation per job and fans the result
//! out to every request waiting on the asset.

use std::sync::Arc;

use common::delivery::{DeliveryError, Fanout, MediaKind, VIDEO_CAPTION};
use common::entity::{asset, video_request};
use common::ledger::{self, FailOutcome, GenerationStart};
use common::{
    DlqEnvelope, DlqErrorCode, DlqMessageType, GenerationJob, RetryAttempt, RetryDecision,
    RetryPolicy,
};
use mq::JobQueue;
use sea_orm::DatabaseConnection;
use tracing::{error, info, instrument, warn};

use crate::error::GenerationError;
use crate::media::{Artifacts, MediaPipeline};

/// How a job ended. Every variant acknowledges the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Generated, uploaded and fanned out.
    Delivered { completed: u64 },
    /// The handle already existed; only the fan-out was redone.
    Resumed { completed: u64 },
    NoSubscribers,
    /// The asset had already failed.
    Stale,
    /// Retries exhausted or fatal error. The asset is Failed unless
    /// `failure_recorded` is false.
    Failed { failure_recorded: bool },
}

pub struct Orchestrator {
    db: DatabaseConnection,
    fanout: Fanout,
    pipeline: MediaPipeline,
    queue: Arc<dyn JobQueue>,
    dlq_queue: String,
    policy: RetryPolicy,
}

impl Orchestrator {
    pub fn new(
        db: DatabaseConnection,
        fanout: Fanout,
        pipeline: MediaPipeline,
        queue: Arc<dyn JobQueue>,
        dlq_queue: String,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            db,
            fanout,
            pipeline,
            queue,
            dlq_queue,
            policy,
        }
    }

    /// Process one job to completion, retrying failed attempts with backoff.
    #[instrument(skip_all, fields(asset_id = %job.asset_id, job_id = %job.job_id))]
    pub async fn run(&self, job: &GenerationJob) -> JobOutcome {
        let mut history = Vec::new();
        let mut persisted = 0;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match self.attempt(job, &mut persisted).await {
                Ok(outcome) => return outcome,
                Err(e) => e,
            };
            history.push(RetryAttempt::new(attempt, err.to_string()));

            let decision = if err.is_fatal() {
                RetryDecision::Exhausted
            } else {
                self.policy.decide(attempt, persisted)
            };

            match decision {
                RetryDecision::Retry { delay } => {
                    warn!(
                        attempt,
                        persisted_attempts = persisted,
                        ?delay,
                        error = %err,
                        "Generation attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Exhausted => {
                    error!(
                        attempt,
                        persisted_attempts = persisted,
                        error = %err,
                        "Generation failed on final attempt"
                    );
                    return self.give_up(job, err, history).await;
                }
            }
        }
    }

    async fn attempt(
        &self,
        job: &GenerationJob,
        persisted: &mut u32,
    ) -> Result<JobOutcome, GenerationError> {
        match ledger::begin_generation(&self.db, job.asset_id).await? {
            GenerationStart::NotFound => Err(GenerationError::AssetNotFound(job.asset_id)),
            GenerationStart::Stale(_) => {
                info!("Asset already failed, dropping stale job");
                Ok(JobOutcome::Stale)
            }
            GenerationStart::NoSubscribers(_) => {
                info!("No pending requests, nothing to generate");
                Ok(JobOutcome::NoSubscribers)
            }
            GenerationStart::Resume {
                asset,
                handle,
                pending,
            } => {
                info!(pending = pending.len(), "Handle already published, resuming fan-out");
                let delivered = self.fanout.redeliver(&pending, &handle).await;
                let completed = ledger::complete_requests(&self.db, asset.id, &delivered).await?;
                Ok(JobOutcome::Resumed { completed })
            }
            GenerationStart::Started { asset, pending } => {
                *persisted = u32::try_from(asset.generation_attempts).unwrap_or(0);
                info!(
                    pending = pending.len(),
                    persisted_attempts = *persisted,
                    "Generation started"
                );

                let artifacts = self.pipeline.produce(&asset.name).await?;
                let result = self.deliver(&asset, &pending, &artifacts).await;
                artifacts.cleanup().await;
                result
            }
        }
    }

    /// Upload to the first reachable subscriber, publish the handle, then
    /// send by handle to everyone still pending.
    async fn deliver(
        &self,
        asset: &asset::Model,
        pending: &[video_request::Model],
        artifacts: &Artifacts,
    ) -> Result<JobOutcome, GenerationError> {
        let gateway = self.fanout.gateway();
        let mut last_error = None;
        let mut uploaded = None;

        for request in pending {
            match gateway
                .deliver_new(
                    request.user_id,
                    MediaKind::Video,
                    &artifacts.video,
                    Some(VIDEO_CAPTION),
                )
                .await
            {
                Ok(handle) => {
                    uploaded = Some((request, handle));
                    break;
                }
                Err(e) => {
                    warn!(user_id = request.user_id, error = %e, "Upload to subscriber failed");
                    last_error = Some(e);
                }
            }
        }

        let Some((first, handle)) = uploaded else {
            return Err(GenerationError::NoRecipient(
                last_error.unwrap_or(DeliveryError::MissingHandle),
            ));
        };

        // The handle must be durable before anyone else is sent it.
        let waiting = ledger::publish_handle(&self.db, asset.id, &handle).await?;
        info!(user_id = first.user_id, waiting = waiting.len(), "Handle published");

        self.fanout.follow_up(first.user_id, &first.child_name).await;

        let rest: Vec<video_request::Model> =
            waiting.into_iter().filter(|r| r.id != first.id).collect();
        let mut delivered = self.fanout.redeliver(&rest, &handle).await;
        delivered.push(first.id);

        let completed = ledger::complete_requests(&self.db, asset.id, &delivered).await?;
        if (completed as usize) < rest.len() + 1 {
            warn!(
                completed,
                recipients = rest.len() + 1,
                "Some deliveries failed, leaving those requests pending"
            );
        }
        Ok(JobOutcome::Delivered { completed })
    }

    /// Terminal failure: mark the asset Failed, tell the users, dead-letter the job.
    async fn give_up(
        &self,
        job: &GenerationJob,
        err: GenerationError,
        history: Vec<RetryAttempt>,
    ) -> JobOutcome {
        let failure_recorded = match ledger::fail_generation(&self.db, job.asset_id).await {
            Ok(FailOutcome::Failed { requests, .. }) => {
                self.fanout.notify_failed(job.asset_id, &requests).await;
                true
            }
            Ok(FailOutcome::NotInFlight(found)) => {
                info!(status = %found.status, "Asset no longer in flight, leaving it as is");
                true
            }
            Ok(FailOutcome::NotFound) => true,
            Err(e) => {
                error!(error = %e, "Failed to mark asset as failed");
                false
            }
        };

        let error_code = match err {
            GenerationError::AssetNotFound(_) => DlqErrorCode::AssetNotFound,
            _ => DlqErrorCode::MaxRetriesExceeded,
        };
        let envelope = DlqEnvelope {
            message_id: job.job_id.clone(),
            message_type: DlqMessageType::GenerationJob,
            asset_id: Some(job.asset_id),
            payload: serde_json::to_value(job).unwrap_or_default(),
            error_code,
            error_message: err.to_string(),
            failure_recorded,
            retry_history: history,
        };
        self.dead_letter(&envelope).await;

        JobOutcome::Failed { failure_recorded }
    }

    /// Publish to the dead-letter queue. Failures are logged.
    pub async fn dead_letter(&self, envelope: &DlqEnvelope) {
        if let Err(e) = self.queue.dead_letter(&self.dlq_queue, envelope).await {
            error!(
                message_id = %envelope.message_id,
                error = %e,
                "Failed to publish to DLQ"
            );
        }
    }
}
