use common::worker::Task;
use common::{DlqEnvelope, DlqErrorCode, DlqMessageType, GenerationJob};
use tracing::{error, warn};
use uuid::Uuid;

use crate::orchestrator::{JobOutcome, Orchestrator};

/// Handle one queue task. Returns `None` when the task was not runnable.
pub async fn handle_generation_task(task: Task, orchestrator: &Orchestrator) -> Option<JobOutcome> {
    if !task.is::<GenerationJob>() {
        warn!(task_type = %task.task_type, "Unknown task type, skipping");
        return None;
    }

    let job = match task.payload_as::<GenerationJob>() {
        Ok(job) => job,
        Err(e) => {
            error!(job_id = %task.id, error = %e, "Failed to parse GenerationJob");
            orchestrator.dead_letter(&malformed_envelope(task, e)).await;
            return None;
        }
    };

    Some(orchestrator.run(&job).await)
}

fn malformed_envelope(task: Task, err: serde_json::Error) -> DlqEnvelope {
    let asset_id = task
        .payload
        .get("asset_id")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok());

    DlqEnvelope {
        message_id: task.id,
        message_type: DlqMessageType::GenerationJob,
        asset_id,
        payload: task.payload,
        error_code: DlqErrorCode::DeserializationError,
        error_message: format!("Failed to parse GenerationJob: {err}"),
        // Nothing was touched, so the server must not fail the asset.
        failure_recorded: true,
        retry_history: vec![],
    }
}
