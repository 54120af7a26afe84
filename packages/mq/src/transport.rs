use std::time::Duration;

use common::{DeadLetterReason, Headers, Payload, RetryDecision, RetryPolicy};
use sea_orm::sea_query::{Expr, Index, LockBehavior, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Schema, Set, TransactionTrait,
};
use tracing::{debug, error, info, warn};

use crate::entity::queue_message::{self, Column, Entity};
use crate::error::MqError;
use crate::models::{MessageStatus, QueueMessage, millis_to_datetime, now_millis};

/// Lost compare-and-set races tolerated by one `receive` call before it
/// reports an empty queue.
const MAX_CLAIM_RACES: usize = 3;

/// Result of [`Mq::fail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailResult {
    Retried { attempt: u32, delay: Duration },
    DeadLettered { attempts: u32 },
    /// The delivery lost its lease before the failure was recorded.
    Stale,
}

/// Database-backed durable queue.
///
/// Consumers claim a message with a visibility lease. A message that is not
/// acknowledged before its lease expires is claimed again and delivered with
/// `redelivered = true`.
#[derive(Clone)]
pub struct Mq {
    db: DatabaseConnection,
    lease: Duration,
}

/// Insert a message on any connection (use a transaction to publish atomically
/// with other writes). Returns the message id.
pub async fn enqueue<C: ConnectionTrait>(
    conn: &C,
    topic: &str,
    payload: &Payload,
    headers: &Headers,
    delay_ms: u64,
) -> Result<i32, MqError> {
    let now = now_millis();
    let available_at = now.saturating_add(i64::try_from(delay_ms).unwrap_or(i64::MAX));

    let model = queue_message::ActiveModel {
        topic: Set(topic.to_string()),
        payload: Set(serde_json::to_string(payload)?),
        headers: Set(serde_json::to_string(headers)?),
        status: Set(MessageStatus::Pending.as_str().to_string()),
        dead_reason: Set(None),
        redelivered: Set(false),
        delivery_count: Set(0),
        attempts: Set(0),
        published_at: Set(now),
        available_at: Set(available_at),
        locked_until: Set(None),
        delivery_id: Set(None),
        last_error: Set(None),
        ..Default::default()
    };
    let inserted = model.insert(conn).await?;

    debug!(id = inserted.id, topic, delay_ms, "Message enqueued");
    Ok(inserted.id)
}

impl Mq {
    pub fn new(db: DatabaseConnection, lease: Duration) -> Self {
        Self { db, lease }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Create the queue table and its claim index if they do not exist.
    pub async fn install(&self) -> Result<(), MqError> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let mut table = schema.create_table_from_entity(Entity);
        table.if_not_exists();
        self.db.execute_raw(backend.build(&table)).await?;

        let index = Index::create()
            .if_not_exists()
            .name("idx_queue_message_claim")
            .table(Entity)
            .col(Column::Status)
            .col(Column::AvailableAt)
            .to_owned();
        self.db.execute_raw(backend.build(&index)).await?;

        Ok(())
    }

    /// Publish a message that becomes visible `delay_ms` from now.
    pub async fn send(
        &self,
        topic: &str,
        payload: &Payload,
        headers: &Headers,
        delay_ms: u64,
    ) -> Result<i32, MqError> {
        enqueue(&self.db, topic, payload, headers, delay_ms).await
    }

    /// Claim the oldest visible message, if any.
    ///
    /// Visible means pending and due, or processing with an expired lease.
    /// Messages whose payload cannot be decoded are dead-lettered and skipped.
    pub async fn receive(&self) -> Result<Option<QueueMessage>, MqError> {
        let mut races = 0;
        loop {
            let Some(row) = self.claim().await? else {
                if races < MAX_CLAIM_RACES {
                    // Distinguish "empty" from "lost the race" by re-checking.
                    if self.has_visible().await? {
                        races += 1;
                        continue;
                    }
                }
                return Ok(None);
            };

            match decode(&row) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => {
                    error!(id = row.id, topic = %row.topic, error = %e, "Undecodable payload");
                    self.mark_dead(
                        row.id,
                        row.delivery_id.as_deref(),
                        DeadLetterReason::MalformedPayload,
                        &e.to_string(),
                    )
                    .await?;
                }
            }
        }
    }

    async fn has_visible(&self) -> Result<bool, MqError> {
        let now = now_millis();
        Ok(Entity::find()
            .filter(visible_condition(now))
            .one(&self.db)
            .await?
            .is_some())
    }

    /// One claim attempt. Returns `None` when nothing is visible or another
    /// consumer won the compare-and-set.
    async fn claim(&self) -> Result<Option<queue_message::Model>, MqError> {
        let txn = self.db.begin().await?;
        let now = now_millis();

        let candidate = Entity::find()
            .filter(visible_condition(now))
            .order_by_asc(Column::AvailableAt)
            .order_by_asc(Column::Id)
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .one(&txn)
            .await?;

        let Some(candidate) = candidate else {
            txn.commit().await?;
            return Ok(None);
        };

        let redelivered = candidate.status == MessageStatus::Processing.as_str();
        let delivery_id = uuid::Uuid::new_v4().to_string();
        let locked_until = now.saturating_add(self.lease.as_millis() as i64);
        let delivery_count = candidate.delivery_count + 1;

        let claimed = Entity::update_many()
            .col_expr(Column::Status, Expr::value(MessageStatus::Processing.as_str()))
            .col_expr(Column::LockedUntil, Expr::value(Some(locked_until)))
            .col_expr(Column::DeliveryId, Expr::value(Some(delivery_id.clone())))
            .col_expr(Column::DeliveryCount, Expr::value(delivery_count))
            .col_expr(Column::Redelivered, Expr::value(redelivered))
            .filter(Column::Id.eq(candidate.id))
            .filter(Column::Status.eq(candidate.status.clone()))
            .filter(Column::DeliveryCount.eq(candidate.delivery_count))
            .exec(&txn)
            .await?;

        if claimed.rows_affected == 0 {
            txn.rollback().await?;
            debug!(id = candidate.id, "Lost claim race");
            return Ok(None);
        }
        txn.commit().await?;

        if redelivered {
            warn!(
                id = candidate.id,
                topic = %candidate.topic,
                delivery_count,
                "Lease expired, redelivering message"
            );
        }

        Ok(Some(queue_message::Model {
            status: MessageStatus::Processing.as_str().to_string(),
            redelivered,
            delivery_count,
            locked_until: Some(locked_until),
            delivery_id: Some(delivery_id),
            ..candidate
        }))
    }

    /// Remove a processed message. Returns `false` when this delivery no
    /// longer owns the message (its lease expired and it was claimed again).
    pub async fn ack(&self, message: &QueueMessage) -> Result<bool, MqError> {
        let result = Entity::delete_many()
            .filter(Column::Id.eq(message.id))
            .filter(Column::DeliveryId.eq(message.delivery_id.as_str()))
            .exec(&self.db)
            .await?;

        let acked = result.rows_affected > 0;
        if !acked {
            warn!(id = message.id, topic = %message.topic, "Stale ack ignored");
        }
        Ok(acked)
    }

    /// Move a message to the dead-letter state.
    pub async fn reject(
        &self,
        message: &QueueMessage,
        reason: DeadLetterReason,
        error: &str,
    ) -> Result<bool, MqError> {
        self.mark_dead(message.id, Some(&message.delivery_id), reason, error)
            .await
    }

    /// Make a message visible again after `delay`, counting one attempt.
    pub async fn requeue(&self, message: &QueueMessage, delay: Duration) -> Result<bool, MqError> {
        let attempts = message.attempts.saturating_add(1);
        self.reschedule(message, attempts as i32, delay, None).await
    }

    /// Give a claimed message back without counting an attempt.
    pub async fn release(&self, message: &QueueMessage) -> Result<bool, MqError> {
        self.reschedule(message, message.attempts as i32, Duration::ZERO, None)
            .await
    }

    /// Record a failed attempt and either schedule a retry with backoff or
    /// dead-letter the message once the policy is exhausted.
    pub async fn fail(
        &self,
        message: &QueueMessage,
        error: &str,
        policy: &RetryPolicy,
    ) -> Result<FailResult, MqError> {
        let attempts = message.attempts.saturating_add(1);
        match policy.decide(attempts) {
            RetryDecision::Retry { attempt, delay } => {
                if !self
                    .reschedule(message, attempt as i32, delay, Some(error))
                    .await?
                {
                    return Ok(FailResult::Stale);
                }
                warn!(
                    id = message.id,
                    topic = %message.topic,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error,
                    "Retrying message"
                );
                Ok(FailResult::Retried { attempt, delay })
            }
            RetryDecision::Exhausted { attempts } => {
                let updated = Entity::update_many()
                    .col_expr(Column::Attempts, Expr::value(attempts as i32))
                    .filter(Column::Id.eq(message.id))
                    .filter(Column::DeliveryId.eq(message.delivery_id.as_str()))
                    .exec(&self.db)
                    .await?;
                if updated.rows_affected == 0 {
                    return Ok(FailResult::Stale);
                }
                error!(
                    id = message.id,
                    topic = %message.topic,
                    attempts,
                    error,
                    "Max retries exhausted, dead-lettering message"
                );
                self.reject(message, DeadLetterReason::MaxRetriesExceeded, error)
                    .await?;
                Ok(FailResult::DeadLettered { attempts })
            }
        }
    }

    async fn reschedule(
        &self,
        message: &QueueMessage,
        attempts: i32,
        delay: Duration,
        error: Option<&str>,
    ) -> Result<bool, MqError> {
        let available_at = now_millis().saturating_add(delay.as_millis() as i64);
        let mut update = Entity::update_many()
            .col_expr(Column::Status, Expr::value(MessageStatus::Pending.as_str()))
            .col_expr(Column::Attempts, Expr::value(attempts))
            .col_expr(Column::AvailableAt, Expr::value(available_at))
            .col_expr(Column::LockedUntil, Expr::value(Option::<i64>::None))
            .col_expr(Column::DeliveryId, Expr::value(Option::<String>::None))
            .col_expr(Column::Redelivered, Expr::value(false));
        if let Some(error) = error {
            update = update.col_expr(Column::LastError, Expr::value(Some(error.to_string())));
        }

        let result = update
            .filter(Column::Id.eq(message.id))
            .filter(Column::DeliveryId.eq(message.delivery_id.as_str()))
            .exec(&self.db)
            .await?;

        let rescheduled = result.rows_affected > 0;
        if !rescheduled {
            warn!(id = message.id, "Stale requeue ignored");
        }
        Ok(rescheduled)
    }

    async fn mark_dead(
        &self,
        id: i32,
        delivery_id: Option<&str>,
        reason: DeadLetterReason,
        error: &str,
    ) -> Result<bool, MqError> {
        let mut update = Entity::update_many()
            .col_expr(Column::Status, Expr::value(MessageStatus::Dead.as_str()))
            .col_expr(Column::DeadReason, Expr::value(Some(reason.as_str().to_string())))
            .col_expr(Column::LastError, Expr::value(Some(error.to_string())))
            .col_expr(Column::LockedUntil, Expr::value(Option::<i64>::None))
            .col_expr(Column::DeliveryId, Expr::value(Option::<String>::None))
            .filter(Column::Id.eq(id));
        if let Some(delivery_id) = delivery_id {
            update = update.filter(Column::DeliveryId.eq(delivery_id));
        }

        let result = update.exec(&self.db).await?;
        let dead = result.rows_affected > 0;
        if dead {
            info!(id, reason = %reason, "Message dead-lettered");
        } else {
            warn!(id, reason = %reason, "Stale reject ignored");
        }
        Ok(dead)
    }
}

fn visible_condition(now: i64) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(Column::Status.eq(MessageStatus::Pending.as_str()))
                .add(Column::AvailableAt.lte(now)),
        )
        .add(
            Condition::all()
                .add(Column::Status.eq(MessageStatus::Processing.as_str()))
                .add(Column::LockedUntil.lte(now)),
        )
}

fn decode(row: &queue_message::Model) -> Result<QueueMessage, serde_json::Error> {
    let payload: Payload = serde_json::from_str(&row.payload)?;
    let headers: Headers = serde_json::from_str(&row.headers).unwrap_or_else(|e| {
        warn!(id = row.id, error = %e, "Ignoring undecodable headers");
        Headers::new()
    });

    Ok(QueueMessage {
        id: row.id,
        topic: row.topic.clone(),
        payload,
        headers,
        redelivered: row.redelivered,
        delivery_count: row.delivery_count.max(0) as u32,
        attempts: row.attempts.max(0) as u32,
        published_at: millis_to_datetime(row.published_at),
        available_at: millis_to_datetime(row.available_at),
        delivery_id: row.delivery_id.clone().unwrap_or_default(),
    })
}
