use chrono::{DateTime, Utc};
use common::entity::dead_letter_message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::shared::Pagination;

/// Query parameters for listing DLQ messages.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListDlqParams {
    /// Filter by resolved status.
    #[param(example = false)]
    pub resolved: Option<bool>,
    /// Page number (1-indexed).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    #[param(example = 20)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DlqMessageResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "0199a7c2-5b1e-7d3a-9f00-3c2d1e0b4a55")]
    pub message_id: String,
    #[schema(example = "generation_job")]
    pub message_type: String,
    /// Asset ID (null if unknown, e.g., deserialization failure).
    pub asset_id: Option<Uuid>,
    /// Full message payload.
    pub payload: serde_json::Value,
    #[schema(example = "MAX_RETRIES_EXCEEDED")]
    pub error_code: String,
    #[schema(example = "TTS returned 503")]
    pub error_message: String,
    #[schema(example = 3)]
    pub retry_count: i32,
    /// Retry history: array of {attempt, error, timestamp}.
    pub retry_history: serde_json::Value,
    pub first_failed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[schema(example = false)]
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    #[schema(example = "ops")]
    pub resolved_by: Option<String>,
}

impl From<dead_letter_message::Model> for DlqMessageResponse {
    fn from(m: dead_letter_message::Model) -> Self {
        Self {
            id: m.id,
            message_id: m.message_id,
            message_type: m.message_type,
            asset_id: m.asset_id,
            payload: m.payload,
            error_code: m.error_code,
            error_message: m.error_message,
            retry_count: m.retry_count,
            retry_history: m.retry_history,
            first_failed_at: m.first_failed_at,
            created_at: m.created_at,
            resolved: m.resolved,
            resolved_at: m.resolved_at,
            resolved_by: m.resolved_by,
        }
    }
}

/// Paginated list of DLQ messages.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DlqListResponse {
    pub data: Vec<DlqMessageResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct ResolveDlqRequest {
    /// Who resolved the message, for the audit trail.
    #[schema(example = "ops")]
    pub resolved_by: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DlqResolveResponse {
    #[schema(example = "Message resolved")]
    pub message: String,
}
