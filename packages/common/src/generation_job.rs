use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mq::Message;

/// A generation job message sent to the worker queue.
///
/// Carries only the asset id: the worker re-reads the asset and its
/// pending requests when it picks the job up, so late subscribers are
/// included without the job ever being rewritten.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationJob {
    /// Job identifier (UUID)
    pub job_id: String,
    /// Asset to generate
    pub asset_id: Uuid,
}

impl GenerationJob {
    /// Create a new generation job with a generated UUID.
    pub fn new(asset_id: Uuid) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            asset_id,
        }
    }
}

impl Message for GenerationJob {
    fn message_type() -> &'static str {
        "generate_video"
    }

    fn message_id(&self) -> &str {
        &self.job_id
    }
}
