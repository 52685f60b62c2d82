use serde::{Deserialize, Serialize};

use crate::mq::Message;

/// Envelope published on the work queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub task_type: String,
    pub payload: serde_json::Value,
}

impl Task {
    /// Wrap a typed message, using its type as the task type.
    pub fn from_message<M: Message>(message: &M) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: message.message_id().to_string(),
            task_type: M::message_type().to_string(),
            payload: serde_json::to_value(message)?,
        })
    }

    /// Returns true if this task carries a message of type `M`.
    pub fn is<M: Message>(&self) -> bool {
        self.task_type == M::message_type()
    }

    /// Deserialize the payload into a typed message.
    pub fn payload_as<M: Message>(&self) -> Result<M, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}
