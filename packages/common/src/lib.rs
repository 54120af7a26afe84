pub mod config;
pub mod dlq;
pub mod event;
pub mod hook;
pub mod payload;
pub mod retry;
pub mod storage;
pub mod subscriber;
pub mod topic;
pub mod version;

pub use config::{QueueAppConfig, StorageConfig};
pub use dlq::DeadLetterReason;
pub use retry::{RetryDecision, RetryPolicy};
pub use payload::{AttributeModel, Headers, Payload, merge_payload};
pub use subscriber::SubscriberStatus;
pub use version::{AppVersion, VersionError};
