pub mod config;
pub mod consumer;
pub mod dlq;
pub mod entity;
pub mod error;
pub mod models;
pub mod processor;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ConsumeConfig;
pub use consumer::{Consumer, DrainSummary, Handled};
pub use dlq::{DeadLetter, DeadLetterService, DlqStats, RetryResult};
pub use error::MqError;
pub use models::{MessageStatus, Outcome, QueueMessage};
pub use processor::{DispatchError, Dispatcher, Processor};
pub use transport::{FailResult, Mq, enqueue};
