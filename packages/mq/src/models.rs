use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use common::{Headers, Payload};
use serde::Serialize;

/// Storage state of a queue row. Acknowledged messages are deleted, so there
/// is no "done" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Processing,
    Dead,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Dead => "dead",
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One delivery of a queued message.
#[derive(Debug, Clone, Serialize)]
pub struct QueueMessage {
    pub id: i32,
    pub topic: String,
    pub payload: Payload,
    pub headers: Headers,
    /// Set when an earlier delivery of this message was claimed but never
    /// acknowledged before its lease expired.
    pub redelivered: bool,
    pub delivery_count: u32,
    /// Failed processing attempts so far.
    pub attempts: u32,
    pub published_at: DateTime<Utc>,
    pub available_at: DateTime<Utc>,
    /// Token of this delivery; acknowledgements from older deliveries are ignored.
    pub delivery_id: String,
}

impl QueueMessage {
    pub fn is_redelivered(&self) -> bool {
        self.redelivered
    }
}

/// What a processor decided about a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Done (or moot); remove the message.
    Ack,
    /// Permanent failure; move the message to the dead-letter state.
    Reject(String),
    /// Transient failure; make the message visible again after the delay.
    Requeue(Duration),
}

pub(crate) fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
