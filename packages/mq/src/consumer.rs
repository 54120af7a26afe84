use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use common::DeadLetterReason;
use common::hook::HookScope;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::ConsumeConfig;
use crate::error::MqError;
use crate::models::{Outcome, QueueMessage};
use crate::processor::{DispatchError, Dispatcher};
use crate::transport::{FailResult, Mq};

/// What happened to one delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Acked,
    Rejected,
    Requeued,
    /// Processor error, retry scheduled.
    Failed,
    DeadLettered,
    /// The delivery lost its lease before the outcome was recorded.
    Stale,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainSummary {
    pub acked: usize,
    pub rejected: usize,
    pub requeued: usize,
    pub failed: usize,
    pub dead_lettered: usize,
    pub stale: usize,
}

impl DrainSummary {
    pub fn record(&mut self, handled: Handled) {
        match handled {
            Handled::Acked => self.acked += 1,
            Handled::Rejected => self.rejected += 1,
            Handled::Requeued => self.requeued += 1,
            Handled::Failed => self.failed += 1,
            Handled::DeadLettered => self.dead_lettered += 1,
            Handled::Stale => self.stale += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.acked + self.rejected + self.requeued + self.failed + self.dead_lettered + self.stale
    }

    fn merge(&mut self, other: DrainSummary) {
        self.acked += other.acked;
        self.rejected += other.rejected;
        self.requeued += other.requeued;
        self.failed += other.failed;
        self.dead_lettered += other.dead_lettered;
        self.stale += other.stale;
    }
}

/// Pulls messages from the queue and feeds them to a [`Dispatcher`].
pub struct Consumer<Ctx> {
    mq: Mq,
    dispatcher: Arc<Dispatcher<Ctx>>,
    config: ConsumeConfig,
}

impl<Ctx: Send + Sync> Consumer<Ctx> {
    pub fn new(mq: Mq, dispatcher: Dispatcher<Ctx>, config: ConsumeConfig) -> Self {
        Self {
            mq,
            dispatcher: Arc::new(dispatcher),
            config,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<Ctx> {
        &self.dispatcher
    }

    /// Dispatch one delivery and record its outcome on the transport.
    pub async fn handle(&self, ctx: &Ctx, message: &QueueMessage) -> Result<Handled, MqError> {
        let scope = HookScope::new();

        let handled = match self.dispatcher.dispatch(ctx, message, &scope).await {
            Ok(Outcome::Ack) => settled(self.mq.ack(message).await?, Handled::Acked),
            Ok(Outcome::Reject(reason)) => {
                warn!(id = message.id, topic = %message.topic, reason = %reason, "Message rejected");
                settled(
                    self.mq
                        .reject(message, DeadLetterReason::Rejected, &reason)
                        .await?,
                    Handled::Rejected,
                )
            }
            Ok(Outcome::Requeue(delay)) => settled(
                self.mq.requeue(message, delay).await?,
                Handled::Requeued,
            ),
            Err(DispatchError::UnknownTopic(topic)) => {
                error!(
                    id = message.id,
                    topic = %topic,
                    "No processor registered for topic, dead-lettering message"
                );
                settled(
                    self.mq
                        .reject(
                            message,
                            DeadLetterReason::UnknownTopic,
                            &format!("No processor registered for topic '{topic}'"),
                        )
                        .await?,
                    Handled::DeadLettered,
                )
            }
            Err(e) => {
                let error = format!("{e:#}");
                match self.mq.fail(message, &error, &self.config.retry).await? {
                    FailResult::Retried { .. } => Handled::Failed,
                    FailResult::DeadLettered { .. } => Handled::DeadLettered,
                    FailResult::Stale => Handled::Stale,
                }
            }
        };

        Ok(handled)
    }

    /// Process every visible message, then return.
    ///
    /// Stops early after `batch_size` messages (when non-zero) or when a
    /// message that was already handled in this pass shows up again (it was
    /// requeued without delay), so a single pass always terminates.
    pub async fn drain(&self, ctx: &Ctx) -> Result<DrainSummary, MqError> {
        let mut summary = DrainSummary::default();
        let mut seen = HashSet::new();

        while self.config.batch_size == 0 || summary.total() < self.config.batch_size {
            let Some(message) = self.mq.receive().await? else {
                break;
            };
            if !seen.insert(message.id) {
                self.mq.release(&message).await?;
                break;
            }
            summary.record(self.handle(ctx, &message).await?);
        }

        if summary.total() > 0 {
            info!(
                acked = summary.acked,
                rejected = summary.rejected,
                requeued = summary.requeued,
                failed = summary.failed,
                dead_lettered = summary.dead_lettered,
                "Queue drained"
            );
        }
        Ok(summary)
    }

    /// Drain repeatedly, sleeping `poll_interval` between passes, until
    /// `shutdown` resolves. Transport errors are logged and retried on the
    /// next tick.
    pub async fn run<F>(&self, ctx: &Ctx, shutdown: F) -> DrainSummary
    where
        F: Future<Output = ()>,
    {
        let mut total = DrainSummary::default();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                result = self.drain(ctx) => match result {
                    Ok(summary) => total.merge(summary),
                    Err(e) => error!(error = %e, "Queue drain failed"),
                },
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!("Consumer stopped");
        total
    }
}

fn settled(owned: bool, handled: Handled) -> Handled {
    if owned { handled } else { Handled::Stale }
}
