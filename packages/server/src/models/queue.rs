use common::DeadLetterReason;
use mq::{DeadLetter, DlqStats};
use serde::{Deserialize, Serialize};

use crate::models::shared::Pagination;

#[derive(Debug, Deserialize)]
pub struct ListDeadParams {
    pub topic: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct DeadLetterListResponse {
    pub data: Vec<DeadLetter>,
    pub stats: DlqStats,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct RetryResponse {
    pub id: i32,
    pub requeued: bool,
}

#[derive(Debug, Deserialize)]
pub struct PurgeParams {
    pub reason: Option<DeadLetterReason>,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub deleted: u64,
}
