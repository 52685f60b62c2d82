use chrono::{DateTime, Duration, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::status::AssetStatus;

/// One canonical video per normalized child name.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "video_asset")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Normalized (trimmed, lowercased) child name.
    #[sea_orm(unique)]
    pub name: String,

    #[sea_orm(indexed)]
    pub status: AssetStatus,

    /// Reusable delivery handle. Present iff status is Available.
    pub delivery_handle: Option<String>,

    /// Attempts started in the current generation epoch.
    #[sea_orm(default_value = 0)]
    pub generation_attempts: i32,

    pub created_at: DateTimeUtc,

    /// When the cached handle was captured. Cleared on re-arm.
    pub generated_at: Option<DateTimeUtc>,

    /// When a job for the current epoch was accepted by the queue.
    pub enqueued_at: Option<DateTimeUtc>,

    #[sea_orm(indexed)]
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// An Available asset older than the retention window must be regenerated.
    ///
    /// Age is measured from the last successful generation, falling back to
    /// the creation time for assets that never recorded one.
    pub fn is_expired(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        let produced_at = self.generated_at.unwrap_or(self.created_at);
        now - produced_at > retention
    }

    /// The handle to serve from cache, if this asset is a valid cache hit.
    pub fn cached_handle(&self, now: DateTime<Utc>, retention: Duration) -> Option<&str> {
        match (self.status, self.delivery_handle.as_deref()) {
            (AssetStatus::Available, Some(handle)) if !self.is_expired(now, retention) => {
                Some(handle)
            }
            _ => None,
        }
    }
}
