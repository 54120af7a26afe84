//! Persisted notification records.
//!
//! Asynchronous jobs report their outcome by leaving a message for the
//! requesting user or customer, shown on their next page load.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, Set};

use crate::entity::{customer_message, user_message};

pub const STATUS_UNSEEN: &str = "unseen";

/// Title and body with `{name}` placeholders.
#[derive(Debug, Clone, Copy)]
pub struct MessageTemplate {
    pub title: &'static str,
    pub body: &'static str,
}

impl MessageTemplate {
    /// Substitute every `{name}` placeholder listed in `vars`. Unknown
    /// placeholders are left as they are.
    pub fn render(&self, vars: &[(&str, &str)]) -> (String, String) {
        (render(self.title, vars), render(self.body, vars))
    }
}

pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{name}}}"), value)
    })
}

pub const EXPORT_READY: MessageTemplate = MessageTemplate {
    title: "Your export is ready",
    body: "The export of {count} subscribers is ready. Download it from {url}. \
           The file will be removed after 24 hours.",
};

pub async fn notify_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    title: String,
    message: String,
) -> Result<user_message::Model, DbErr> {
    user_message::ActiveModel {
        user_id: Set(user_id),
        title: Set(title),
        message: Set(message),
        status: Set(STATUS_UNSEEN.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await
}

pub async fn notify_customer<C: ConnectionTrait>(
    conn: &C,
    customer_id: i32,
    title: String,
    message: String,
) -> Result<customer_message::Model, DbErr> {
    customer_message::ActiveModel {
        customer_id: Set(customer_id),
        title: Set(title),
        message: Set(message),
        status: Set(STATUS_UNSEEN.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await
}
