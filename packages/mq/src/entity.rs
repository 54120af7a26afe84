//! Durable storage of queued messages.

pub mod queue_message {
    use sea_orm::entity::prelude::*;

    /// One queued message. Timestamps are epoch milliseconds so that lease
    /// comparisons behave the same on every backend.
    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "queue_message")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub topic: String,
        /// JSON object, kept as text so that an undecodable payload can be
        /// dead-lettered instead of failing the whole claim.
        #[sea_orm(column_type = "Text")]
        pub payload: String,
        #[sea_orm(column_type = "Text")]
        pub headers: String,
        /// pending | processing | dead
        pub status: String,
        pub dead_reason: Option<String>,
        pub redelivered: bool,
        pub delivery_count: i32,
        pub attempts: i32,
        pub published_at: i64,
        pub available_at: i64,
        pub locked_until: Option<i64>,
        pub delivery_id: Option<String>,
        #[sea_orm(column_type = "Text", nullable)]
        pub last_error: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
