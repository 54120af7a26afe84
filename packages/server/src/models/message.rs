use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::user_message;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: i32,
    pub title: String,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<user_message::Model> for MessageResponse {
    fn from(m: user_message::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            message: m.message,
            status: m.status,
            created_at: m.created_at,
        }
    }
}
