use async_trait::async_trait;
use common::DlqEnvelope;
use common::mq::Message;
use common::worker::Task;
use tracing::debug;

use crate::error::MqError;
use crate::models::MqQueue;

/// Publishing side of the work queue.
///
/// Delivery is at-least-once and unordered across messages; consumers must
/// tolerate duplicates.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, queue: &str, task: &Task) -> Result<(), MqError>;

    async fn dead_letter(&self, queue: &str, envelope: &DlqEnvelope) -> Result<(), MqError>;
}

#[async_trait]
impl JobQueue for MqQueue {
    async fn enqueue(&self, queue: &str, task: &Task) -> Result<(), MqError> {
        self.publish(queue, None, task, None).await?;
        debug!(queue, task_id = %task.id, task_type = %task.task_type, "Task published");
        Ok(())
    }

    async fn dead_letter(&self, queue: &str, envelope: &DlqEnvelope) -> Result<(), MqError> {
        self.publish(queue, None, envelope, None).await?;
        Ok(())
    }
}

/// Wrap `message` in a [`Task`] envelope and enqueue it.
pub async fn enqueue_message<M: Message>(
    queue: &dyn JobQueue,
    topic: &str,
    message: &M,
) -> Result<String, MqError> {
    let task = Task::from_message(message)?;
    queue.enqueue(topic, &task).await?;
    Ok(task.id)
}
