use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::{info, instrument};

use crate::dlq::{ResolveResult, dlq_service};
use crate::error::{AppError, ErrorBody};
use crate::extractors::{AdminToken, AppJson};
use crate::models::dlq::*;
use crate::models::shared::Pagination;
use crate::state::AppState;

/// List dead letter messages.
#[utoipa::path(
    get,
    path = "/dlq",
    tag = "Dead Letter Queue",
    operation_id = "listDlqMessages",
    summary = "List dead letter messages",
    description = "Returns a paginated list of dead letter messages, newest first. Requires the admin token.",
    params(ListDlqParams),
    responses(
        (status = 200, description = "List of DLQ messages", body = DlqListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("admin_token" = [])),
)]
#[instrument(skip(state, _admin))]
pub async fn list_dlq_messages(
    _admin: AdminToken,
    State(state): State<AppState>,
    Query(params): Query<ListDlqParams>,
) -> Result<Json<DlqListResponse>, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);

    let (messages, total) = dlq_service(&state.db)
        .list(params.resolved, page, per_page)
        .await?;

    Ok(Json(DlqListResponse {
        data: messages.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}

/// Resolve a DLQ message.
#[utoipa::path(
    post,
    path = "/dlq/{id}/resolve",
    tag = "Dead Letter Queue",
    operation_id = "resolveDlqMessage",
    summary = "Resolve a DLQ message",
    description = "Marks a DLQ message as handled. The body may be `{}`. Requires the admin token.",
    params(("id" = i32, Path, description = "DLQ message ID")),
    request_body = ResolveDlqRequest,
    responses(
        (status = 200, description = "Message resolved", body = DlqResolveResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Message not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Message already resolved (CONFLICT)", body = ErrorBody),
    ),
    security(("admin_token" = [])),
)]
#[instrument(skip(state, _admin, payload))]
pub async fn resolve_dlq_message(
    _admin: AdminToken,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<ResolveDlqRequest>,
) -> Result<Json<DlqResolveResponse>, AppError> {
    match dlq_service(&state.db).resolve(id, payload.resolved_by).await? {
        ResolveResult::Resolved => {
            info!(id, "DLQ message resolved");
            Ok(Json(DlqResolveResponse {
                message: "Message resolved".into(),
            }))
        }
        ResolveResult::AlreadyResolved => {
            Err(AppError::Conflict("Message already resolved".into()))
        }
        ResolveResult::NotFound => Err(AppError::NotFound(format!("DLQ message {id} not found"))),
    }
}
