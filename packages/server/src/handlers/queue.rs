use axum::{
    Json,
    extract::{Path, Query, State},
};
use mq::{DeadLetterService, RetryResult};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::queue::{
    DeadLetterListResponse, ListDeadParams, PurgeParams, PurgeResponse, RetryResponse,
};
use crate::models::shared::{PageParams, Pagination};
use crate::state::AppState;

/// Dead-lettered queue messages, newest first.
#[instrument(skip(state))]
pub async fn list_dead_letters(
    State(state): State<AppState>,
    Query(params): Query<ListDeadParams>,
) -> Result<Json<DeadLetterListResponse>, AppError> {
    let (page, per_page) = PageParams {
        page: params.page,
        per_page: params.per_page,
    }
    .resolve();

    let dlq = DeadLetterService::new(&state.db);
    let (data, total) = dlq.list(params.topic.as_deref(), page, per_page).await?;
    let stats = dlq.stats().await?;

    Ok(Json(DeadLetterListResponse {
        data,
        stats,
        pagination: Pagination::new(page, per_page, total),
    }))
}

/// Make a dead-lettered message visible again.
#[instrument(skip(state), fields(id))]
pub async fn retry_dead_letter(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RetryResponse>, AppError> {
    match DeadLetterService::new(&state.db).retry(id).await? {
        RetryResult::Requeued => {
            info!(id, "Dead-lettered message requeued");
            Ok(Json(RetryResponse { id, requeued: true }))
        }
        RetryResult::NotFound => Err(AppError::NotFound(format!("Message {id} not found"))),
        RetryResult::NotDead => Err(AppError::Conflict(format!(
            "Message {id} is not dead-lettered"
        ))),
    }
}

/// Delete dead-lettered messages, optionally only those with one reason.
#[instrument(skip(state))]
pub async fn purge_dead_letters(
    State(state): State<AppState>,
    Query(params): Query<PurgeParams>,
) -> Result<Json<PurgeResponse>, AppError> {
    let deleted = DeadLetterService::new(&state.db).purge(params.reason).await?;
    info!(deleted, reason = ?params.reason, "Dead-lettered messages purged");
    Ok(Json(PurgeResponse { deleted }))
}
