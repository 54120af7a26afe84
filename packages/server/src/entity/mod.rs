pub mod app_option;
pub mod customer;
pub mod customer_message;
pub mod list;
pub mod list_subscriber;
pub mod list_subscriber_count_history;
pub mod translation_source;
pub mod user;
pub mod user_message;

/// Prefix of every application table.
pub const TABLE_PREFIX: &str = "ema_";
