use chrono::{DateTime, Utc};
use common::AssetStatus;
use common::entity::asset;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::Reply;
use crate::retry_trigger::RetryOutcome;

#[derive(Serialize, utoipa::ToSchema)]
pub struct AssetResponse {
    pub id: Uuid,
    /// Normalized child name.
    #[schema(example = "маша")]
    pub name: String,
    pub status: AssetStatus,
    /// Whether a reusable delivery handle is cached.
    pub has_handle: bool,
    #[schema(example = 1)]
    pub generation_attempts: i32,
    pub created_at: DateTime<Utc>,
    pub generated_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<asset::Model> for AssetResponse {
    fn from(m: asset::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            status: m.status,
            has_handle: m.delivery_handle.is_some(),
            generation_attempts: m.generation_attempts,
            created_at: m.created_at,
            generated_at: m.generated_at,
            updated_at: m.updated_at,
        }
    }
}

/// Request body for the manual retry action.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RetryAssetRequest {
    /// Chat id of the user who pressed "try again".
    #[schema(example = 123456789)]
    pub user_id: i64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RetryAssetResponse {
    pub outcome: RetryOutcome,
    pub reply: Reply,
}

impl From<RetryOutcome> for RetryAssetResponse {
    fn from(outcome: RetryOutcome) -> Self {
        Self {
            reply: Reply::from_notice(&outcome.notice()),
            outcome,
        }
    }
}
