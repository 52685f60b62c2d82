use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::Reply;
use crate::ordering::{OrderOutcome, OrderStatus};

/// Request body for placing an order.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct PlaceOrderRequest {
    /// Chat id of the ordering user.
    #[schema(example = 123456789)]
    pub user_id: i64,
    /// Child name as typed. One word, 2-50 letters.
    #[schema(example = "Маша")]
    pub child_name: String,
    /// Child age, 1-18.
    #[schema(example = 5)]
    pub child_age: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct OrderResponse {
    pub status: OrderStatus,
    pub asset_id: Uuid,
    #[schema(example = 42)]
    pub request_id: i32,
    /// Whether the cached video already reached the user.
    pub delivered: bool,
    /// Message to show the user, absent when the video itself was the answer.
    pub reply: Option<Reply>,
}

impl From<OrderOutcome> for OrderResponse {
    fn from(outcome: OrderOutcome) -> Self {
        Self {
            reply: outcome.reply().as_ref().map(Reply::from_notice),
            status: outcome.status,
            asset_id: outcome.asset_id,
            request_id: outcome.request_id,
            delivered: outcome.delivered,
        }
    }
}
