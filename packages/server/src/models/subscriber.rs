use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::list_subscriber;
use crate::filters::SubscriberSearch;
use crate::models::shared::Pagination;

#[derive(Debug, Serialize)]
pub struct SubscriberResponse {
    pub id: i32,
    pub list_id: i32,
    pub email: String,
    pub status: String,
    pub source: String,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<list_subscriber::Model> for SubscriberResponse {
    fn from(m: list_subscriber::Model) -> Self {
        Self {
            id: m.id,
            list_id: m.list_id,
            email: m.email,
            status: m.status,
            source: m.source,
            ip_address: m.ip_address,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscriberListResponse {
    /// The filter in effect, including values remembered from earlier requests.
    pub filter: SubscriberSearch,
    pub data: Vec<SubscriberResponse>,
    pub pagination: Pagination,
}

/// Returned when an export job has been queued.
#[derive(Debug, Serialize)]
pub struct ExportAccepted {
    pub message_id: i32,
    pub topic: &'static str,
}
