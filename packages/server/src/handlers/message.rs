use axum::{
    Json,
    extract::{Query, State},
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Serialize;
use tracing::instrument;

use crate::entity::user_message::{Column, Entity};
use crate::error::AppError;
use crate::extractors::user::ActingUser;
use crate::models::message::MessageResponse;
use crate::models::shared::{PageParams, Pagination};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub data: Vec<MessageResponse>,
    pub pagination: Pagination,
}

/// Notification records of the acting user, newest first.
#[instrument(skip(state), fields(user_id = user.user_id))]
pub async fn list_messages(
    user: ActingUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<MessageListResponse>, AppError> {
    let (page, per_page) = params.resolve();

    let query = Entity::find().filter(Column::UserId.eq(user.user_id));
    let total = query.clone().count(&state.db).await?;
    let rows = query
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
        .offset(PageParams::offset(page, per_page))
        .limit(per_page)
        .all(&state.db)
        .await?;

    Ok(Json(MessageListResponse {
        data: rows.into_iter().map(MessageResponse::from).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}
