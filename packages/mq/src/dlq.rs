use std::collections::HashMap;

use common::DeadLetterReason;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Serialize;

use crate::entity::queue_message::{self, Column, Entity};
use crate::models::{MessageStatus, millis_to_datetime, now_millis};

/// Largest offset the database drivers accept.
const MAX_OFFSET: u64 = i64::MAX as u64;

/// A dead-lettered message as shown to operators.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetter {
    pub id: i32,
    pub topic: String,
    /// Raw payload text; it may be the reason the message died.
    pub payload: String,
    pub reason: Option<String>,
    pub error: Option<String>,
    pub attempts: i32,
    pub delivery_count: i32,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl From<queue_message::Model> for DeadLetter {
    fn from(m: queue_message::Model) -> Self {
        Self {
            id: m.id,
            topic: m.topic,
            payload: m.payload,
            reason: m.dead_reason,
            error: m.last_error,
            attempts: m.attempts,
            delivery_count: m.delivery_count,
            published_at: millis_to_datetime(m.published_at),
        }
    }
}

/// Result of attempting to retry a dead-lettered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryResult {
    Requeued,
    NotFound,
    /// The message exists but is not dead.
    NotDead,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DlqStats {
    pub total: u64,
    pub by_reason: HashMap<String, u64>,
    pub by_topic: HashMap<String, u64>,
}

pub struct DeadLetterService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> DeadLetterService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Dead-lettered messages, newest first. `page` is 1-based.
    pub async fn list(
        &self,
        topic: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<DeadLetter>, u64), DbErr> {
        let mut query = Entity::find().filter(Column::Status.eq(MessageStatus::Dead.as_str()));
        if let Some(topic) = topic {
            query = query.filter(Column::Topic.eq(topic));
        }

        let total = query.clone().count(self.conn).await?;
        let messages = query
            .order_by_desc(Column::Id)
            .offset(
                page.saturating_sub(1)
                    .saturating_mul(per_page)
                    .min(MAX_OFFSET),
            )
            .limit(per_page)
            .all(self.conn)
            .await?;

        Ok((messages.into_iter().map(DeadLetter::from).collect(), total))
    }

    pub async fn stats(&self) -> Result<DlqStats, DbErr> {
        let rows: Vec<(String, Option<String>)> = Entity::find()
            .select_only()
            .column(Column::Topic)
            .column(Column::DeadReason)
            .filter(Column::Status.eq(MessageStatus::Dead.as_str()))
            .into_tuple()
            .all(self.conn)
            .await?;

        let mut stats = DlqStats {
            total: rows.len() as u64,
            ..DlqStats::default()
        };
        for (topic, reason) in rows {
            *stats.by_topic.entry(topic).or_insert(0) += 1;
            let reason = reason.unwrap_or_else(|| "UNKNOWN".to_string());
            *stats.by_reason.entry(reason).or_insert(0) += 1;
        }
        Ok(stats)
    }

    /// Make a dead message visible again with a fresh attempt budget.
    pub async fn retry(&self, id: i32) -> Result<RetryResult, DbErr> {
        let result = Entity::update_many()
            .col_expr(Column::Status, Expr::value(MessageStatus::Pending.as_str()))
            .col_expr(Column::DeadReason, Expr::value(Option::<String>::None))
            .col_expr(Column::Attempts, Expr::value(0))
            .col_expr(Column::Redelivered, Expr::value(false))
            .col_expr(Column::AvailableAt, Expr::value(now_millis()))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.eq(MessageStatus::Dead.as_str()))
            .exec(self.conn)
            .await?;

        if result.rows_affected > 0 {
            return Ok(RetryResult::Requeued);
        }

        let exists = Entity::find_by_id(id).one(self.conn).await?.is_some();
        if exists {
            Ok(RetryResult::NotDead)
        } else {
            Ok(RetryResult::NotFound)
        }
    }

    /// Delete dead messages, optionally only those with one reason. Returns
    /// the number of rows deleted.
    pub async fn purge(&self, reason: Option<DeadLetterReason>) -> Result<u64, DbErr> {
        let mut delete =
            Entity::delete_many().filter(Column::Status.eq(MessageStatus::Dead.as_str()));
        if let Some(reason) = reason {
            delete = delete.filter(Column::DeadReason.eq(reason.as_str()));
        }
        Ok(delete.exec(self.conn).await?.rows_affected)
    }
}
