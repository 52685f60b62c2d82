use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::AppJson;
use crate::models::order::{OrderResponse, PlaceOrderRequest};
use crate::ordering::place_order;
use crate::state::AppState;

/// Place an order for a personalized video.
#[utoipa::path(
    post,
    path = "/orders",
    tag = "Orders",
    operation_id = "placeOrder",
    summary = "Place a video order",
    description = "Validates the child name, then serves the cached video, joins an in-flight \
                   generation, or queues a new one.",
    request_body = PlaceOrderRequest,
    responses(
        (status = 200, description = "Order accepted", body = OrderResponse),
        (status = 400, description = "Invalid name or age (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(user_id = payload.user_id))]
pub async fn create_order(
    State(state): State<AppState>,
    AppJson(payload): AppJson<PlaceOrderRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let outcome = place_order(
        &state,
        payload.user_id,
        &payload.child_name,
        payload.child_age,
    )
    .await?;
    Ok(Json(outcome.into()))
}
