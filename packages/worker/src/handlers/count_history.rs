use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::SubscriberStatus;
use common::hook::HookScope;
use common::payload::payload_i64;
use common::topic::LIST_SUBSCRIBER_COUNT_HISTORY_UPDATE;
use mq::{Outcome, Processor, QueueMessage};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use server::entity::{list, list_subscriber, list_subscriber_count_history as history};
use server::options::{self, COUNT_HISTORY_ENABLED};
use tracing::{debug, info, instrument};

use crate::context::WorkerContext;

/// Records the confirmed subscriber count of lists in hourly buckets.
pub struct CountHistory;

/// Start of the hour containing `at`.
pub fn hour_bucket(at: DateTime<Utc>) -> DateTime<Utc> {
    let secs = at.timestamp();
    DateTime::from_timestamp(secs - secs.rem_euclid(3600), 0).unwrap_or(at)
}

/// Upsert the bucket of `at` for one list. Returns `(total, hourly_total)`.
pub async fn record_list<C: ConnectionTrait>(
    conn: &C,
    list_id: i32,
    at: DateTime<Utc>,
) -> Result<(i32, i32), DbErr> {
    let bucket = hour_bucket(at);

    let total = list_subscriber::Entity::find()
        .filter(list_subscriber::Column::ListId.eq(list_id))
        .filter(list_subscriber::Column::Status.eq(SubscriberStatus::Confirmed.as_str()))
        .count(conn)
        .await?;
    let total = i32::try_from(total).unwrap_or(i32::MAX);

    let previous: Option<i32> = history::Entity::find()
        .select_only()
        .column(history::Column::Total)
        .filter(history::Column::ListId.eq(list_id))
        .filter(history::Column::CreatedAt.lt(bucket))
        .order_by_desc(history::Column::CreatedAt)
        .into_tuple()
        .one(conn)
        .await?;
    let hourly_total = previous.map_or(total, |previous| total - previous);

    history::Entity::insert(history::ActiveModel {
        list_id: Set(list_id),
        total: Set(total),
        hourly_total: Set(hourly_total),
        created_at: Set(bucket),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::columns([history::Column::ListId, history::Column::CreatedAt])
            .update_columns([history::Column::Total, history::Column::HourlyTotal])
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    debug!(list_id, total, hourly_total, bucket = %bucket, "Count history recorded");
    Ok((total, hourly_total))
}

#[async_trait]
impl Processor<WorkerContext> for CountHistory {
    fn topic(&self) -> &'static str {
        LIST_SUBSCRIBER_COUNT_HISTORY_UPDATE
    }

    #[instrument(skip_all, fields(id = message.id))]
    async fn process(
        &self,
        ctx: &WorkerContext,
        message: &QueueMessage,
        _scope: &HookScope,
    ) -> anyhow::Result<Outcome> {
        if !options::get_or(&ctx.db, COUNT_HISTORY_ENABLED, false).await? {
            debug!("Subscriber count history is disabled");
            return Ok(Outcome::Ack);
        }

        let mut lists = list::Entity::find()
            .select_only()
            .column(list::Column::Id)
            .order_by_asc(list::Column::Id);
        if let Some(list_id) = payload_i64(&message.payload, "list_id") {
            lists = lists.filter(list::Column::Id.eq(list_id));
        }
        let list_ids: Vec<i32> = lists.into_tuple().all(&ctx.db).await?;

        let now = Utc::now();
        for list_id in &list_ids {
            record_list(&ctx.db, *list_id, now).await?;
        }

        info!(lists = list_ids.len(), "Subscriber count history updated");
        Ok(Outcome::Ack)
    }
}
