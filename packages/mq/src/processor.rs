use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::hook::HookScope;
use thiserror::Error;
use tracing::info;

use crate::models::{Outcome, QueueMessage};

/// Handles every message published on one topic.
#[async_trait]
pub trait Processor<Ctx>: Send + Sync {
    fn topic(&self) -> &'static str;

    /// Returning an error is a transient failure: the transport retries the
    /// message with backoff and dead-letters it once retries are exhausted.
    async fn process(
        &self,
        ctx: &Ctx,
        message: &QueueMessage,
        scope: &HookScope,
    ) -> anyhow::Result<Outcome>;
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No processor registered for topic '{0}'")]
    UnknownTopic(String),

    #[error("A processor is already registered for topic '{0}'")]
    DuplicateTopic(String),

    #[error(transparent)]
    Processor(#[from] anyhow::Error),
}

/// Routes messages to the processor registered for their topic.
pub struct Dispatcher<Ctx> {
    processors: HashMap<&'static str, Arc<dyn Processor<Ctx>>>,
}

impl<Ctx> Default for Dispatcher<Ctx> {
    fn default() -> Self {
        Self {
            processors: HashMap::new(),
        }
    }
}

impl<Ctx: Send + Sync> Dispatcher<Ctx> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P>(&mut self, processor: P) -> Result<(), DispatchError>
    where
        P: Processor<Ctx> + 'static,
    {
        let topic = processor.topic();
        if self.processors.contains_key(topic) {
            return Err(DispatchError::DuplicateTopic(topic.to_string()));
        }
        self.processors.insert(topic, Arc::new(processor));
        Ok(())
    }

    pub fn with<P>(mut self, processor: P) -> Result<Self, DispatchError>
    where
        P: Processor<Ctx> + 'static,
    {
        self.register(processor)?;
        Ok(self)
    }

    pub fn handles(&self, topic: &str) -> bool {
        self.processors.contains_key(topic)
    }

    /// Registered topics, sorted.
    pub fn topics(&self) -> Vec<&'static str> {
        let mut topics: Vec<_> = self.processors.keys().copied().collect();
        topics.sort_unstable();
        topics
    }

    /// Route a message to its processor.
    ///
    /// A redelivered message is acknowledged without reaching the processor:
    /// none of the jobs are safe to replay after a delivery that may already
    /// have produced side effects.
    pub async fn dispatch(
        &self,
        ctx: &Ctx,
        message: &QueueMessage,
        scope: &HookScope,
    ) -> Result<Outcome, DispatchError> {
        let processor = self
            .processors
            .get(message.topic.as_str())
            .ok_or_else(|| DispatchError::UnknownTopic(message.topic.clone()))?;

        if message.is_redelivered() {
            info!(
                id = message.id,
                topic = %message.topic,
                delivery_count = message.delivery_count,
                "Discarding redelivered message"
            );
            return Ok(Outcome::Ack);
        }

        Ok(processor.process(ctx, message, scope).await?)
    }
}
