use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::{CouponDispatcher, DeliveryGateway, MediaKind, Notice, VIDEO_CAPTION};
use crate::entity::video_request;

/// Per-recipient delivery steps shared by the cached path, the generation
/// fan-out and the reconciliation sweep.
///
/// Nothing here aborts on a single recipient: failures are logged and the
/// caller learns which requests were actually delivered.
#[derive(Clone)]
pub struct Fanout {
    gateway: Arc<dyn DeliveryGateway>,
    coupons: CouponDispatcher,
}

impl Fanout {
    pub fn new(gateway: Arc<dyn DeliveryGateway>, coupons: CouponDispatcher) -> Self {
        Self { gateway, coupons }
    }

    pub fn gateway(&self) -> &Arc<dyn DeliveryGateway> {
        &self.gateway
    }

    /// Coupons then the "ready" notice. Failures never propagate.
    pub async fn follow_up(&self, user_id: i64, child_name: &str) {
        self.coupons.send_all(user_id).await;

        let notice = Notice::VideoReady {
            child_name: child_name.to_string(),
        };
        if let Err(e) = self.gateway.notify(user_id, &notice).await {
            warn!(user_id, error = %e, "Failed to send ready notice");
        }
    }

    /// Send the video by handle followed by the follow-ups.
    /// Returns whether the video itself was delivered.
    pub async fn deliver_cached(&self, user_id: i64, child_name: &str, handle: &str) -> bool {
        match self
            .gateway
            .deliver_by_handle(user_id, MediaKind::Video, handle, Some(VIDEO_CAPTION))
            .await
        {
            Ok(()) => {
                self.follow_up(user_id, child_name).await;
                true
            }
            Err(e) => {
                warn!(user_id, error = %e, "Failed to deliver video by handle");
                false
            }
        }
    }

    /// Deliver `handle` to each request, returning the ids delivered.
    pub async fn redeliver(&self, requests: &[video_request::Model], handle: &str) -> Vec<i32> {
        let mut delivered = Vec::with_capacity(requests.len());
        for (index, request) in requests.iter().enumerate() {
            info!(
                asset_id = %request.asset_id,
                user_id = request.user_id,
                recipient = index + 1,
                total = requests.len(),
                "Sending cached video to subscriber"
            );
            if self
                .deliver_cached(request.user_id, &request.child_name, handle)
                .await
            {
                delivered.push(request.id);
            }
        }
        delivered
    }

    /// Tell every affected user once that generation failed, offering a retry.
    pub async fn notify_failed(&self, asset_id: Uuid, requests: &[video_request::Model]) {
        let notice = Notice::GenerationFailed { asset_id };
        let mut users: Vec<i64> = requests.iter().map(|r| r.user_id).collect();
        users.sort_unstable();
        users.dedup();

        for user_id in users {
            if let Err(e) = self.gateway.notify(user_id, &notice).await {
                warn!(%asset_id, user_id, error = %e, "Failed to send failure notice");
            }
        }
    }
}
