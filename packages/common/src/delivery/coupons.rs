use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, Set};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{DeliveryError, DeliveryGateway, MediaKind};
use crate::config::CouponConfig;
use crate::entity::system_asset;

#[derive(Debug, Error)]
pub enum CouponError {
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error(transparent)]
    Db(#[from] DbErr),
}

/// Sends the upsell coupon images, uploading each one once and reusing the
/// cached handle afterwards.
#[derive(Clone)]
pub struct CouponDispatcher {
    db: DatabaseConnection,
    gateway: Arc<dyn DeliveryGateway>,
    config: CouponConfig,
}

impl CouponDispatcher {
    pub fn new(
        db: DatabaseConnection,
        gateway: Arc<dyn DeliveryGateway>,
        config: CouponConfig,
    ) -> Self {
        Self {
            db,
            gateway,
            config,
        }
    }

    /// Send every configured coupon to `user_id`. Failures are logged per coupon.
    pub async fn send_all(&self, user_id: i64) {
        if !self.config.enabled {
            debug!(user_id, "Coupons disabled, skipping");
            return;
        }

        for key in &self.config.keys {
            if let Err(e) = self.send_one(user_id, key).await {
                warn!(user_id, key = %key, error = %e, "Failed to send coupon");
            }
        }
    }

    async fn send_one(&self, user_id: i64, key: &str) -> Result<(), CouponError> {
        let cached = system_asset::Entity::find_by_id(key.to_string())
            .one(&self.db)
            .await?
            .map(|row| row.delivery_handle)
            .filter(|handle| !handle.is_empty());

        if let Some(handle) = cached {
            self.gateway
                .deliver_by_handle(user_id, MediaKind::Photo, &handle, None)
                .await?;
            return Ok(());
        }

        let path = self.coupon_path(key);
        info!(key, path = %path.display(), "Uploading coupon for the first time");
        let handle = self
            .gateway
            .deliver_new(user_id, MediaKind::Photo, &path, None)
            .await?;

        let row = system_asset::ActiveModel {
            key: Set(key.to_string()),
            delivery_handle: Set(handle),
            updated_at: Set(Utc::now()),
        };
        system_asset::Entity::insert(row)
            .on_conflict(
                OnConflict::column(system_asset::Column::Key)
                    .update_columns([
                        system_asset::Column::DeliveryHandle,
                        system_asset::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        info!(key, "Coupon handle cached");
        Ok(())
    }

    fn coupon_path(&self, key: &str) -> PathBuf {
        PathBuf::from(&self.config.assets_dir).join(format!("{key}.jpeg"))
    }
}
