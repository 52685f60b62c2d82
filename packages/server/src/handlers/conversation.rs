use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use crate::conversation::{FlowInput, handle_event};
use crate::error::{AppError, ErrorBody};
use crate::extractors::AppJson;
use crate::models::conversation::ConversationEventResponse;
use crate::state::AppState;

/// Feed one chat event into the ordering dialogue.
#[utoipa::path(
    post,
    path = "/conversations/{user_id}/events",
    tag = "Conversations",
    operation_id = "postConversationEvent",
    summary = "Advance the ordering dialogue",
    description = "Applies a chat event (start, contact, text, button) to the user's stored \
                   dialogue and returns the replies to show. Confirming places the order.",
    params(("user_id" = i64, Path, description = "Chat id")),
    request_body = FlowInput,
    responses(
        (status = 200, description = "Event applied", body = ConversationEventResponse),
        (status = 400, description = "Malformed event (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, input))]
pub async fn post_event(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    AppJson(input): AppJson<FlowInput>,
) -> Result<Json<ConversationEventResponse>, AppError> {
    let result = handle_event(&state, user_id, input).await?;
    Ok(Json(result.into()))
}
