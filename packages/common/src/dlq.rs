use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::retry::RetryAttempt;

/// Error codes for dead-lettered messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DlqErrorCode {
    /// All generation attempts exhausted.
    MaxRetriesExceeded,
    /// Failed to deserialize message payload.
    DeserializationError,
    /// The job referenced an asset that no longer exists.
    AssetNotFound,
    /// Asset stuck in Generating past the reconciliation timeout.
    StuckGeneration,
}

impl DlqErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxRetriesExceeded => "MAX_RETRIES_EXCEEDED",
            Self::DeserializationError => "DESERIALIZATION_ERROR",
            Self::AssetNotFound => "ASSET_NOT_FOUND",
            Self::StuckGeneration => "STUCK_GENERATION",
        }
    }
}

impl std::fmt::Display for DlqErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Type of message that ended up in the dead letter queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DlqMessageType {
    /// Failed generation job (server -> worker message)
    GenerationJob,
}

impl DlqMessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GenerationJob => "generation_job",
        }
    }
}

impl std::fmt::Display for DlqMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DlqMessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generation_job" => Ok(Self::GenerationJob),
            _ => Err(format!(
                "Invalid message_type '{}'. Must be 'generation_job'",
                s
            )),
        }
    }
}

/// Envelope for transporting failed messages to the DLQ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqEnvelope {
    /// Original message ID (job_id).
    pub message_id: String,
    /// Type of message that failed.
    pub message_type: DlqMessageType,
    /// Associated asset.
    ///
    /// `None` when the payload could not be parsed far enough to read it.
    pub asset_id: Option<Uuid>,
    /// Full serialized message payload.
    pub payload: serde_json::Value,
    /// Machine-readable error code.
    pub error_code: DlqErrorCode,
    /// Human-readable error message.
    pub error_message: String,
    /// Whether the worker already marked the asset Failed and notified users.
    #[serde(default)]
    pub failure_recorded: bool,
    /// History of attempts before reaching DLQ.
    pub retry_history: Vec<RetryAttempt>,
}
