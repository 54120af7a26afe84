use common::topic::LIST_SUBSCRIBER_COUNT_HISTORY_UPDATE;
use common::{Headers, Payload};
use mq::MessageStatus;
use mq::entity::queue_message::{Column, Entity};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use server::options::{self, COUNT_HISTORY_ENABLED};
use tracing::debug;

use crate::context::WorkerContext;
use crate::error::Result;

/// Enqueue a count-history job for all lists, unless the job is disabled or
/// one is already pending. Returns the new message id.
pub async fn schedule_count_history(ctx: &WorkerContext) -> Result<Option<i32>> {
    if !options::get_or(&ctx.db, COUNT_HISTORY_ENABLED, false).await? {
        return Ok(None);
    }

    let queued = Entity::find()
        .filter(Column::Topic.eq(LIST_SUBSCRIBER_COUNT_HISTORY_UPDATE))
        .filter(Column::Status.ne(MessageStatus::Dead.as_str()))
        .count(&ctx.db)
        .await?;
    if queued > 0 {
        debug!(queued, "Count history job already queued");
        return Ok(None);
    }

    let id = ctx
        .mq
        .send(
            LIST_SUBSCRIBER_COUNT_HISTORY_UPDATE,
            &Payload::new(),
            &Headers::new(),
            0,
        )
        .await?;
    debug!(id, "Count history job scheduled");
    Ok(Some(id))
}
