use sea_orm::entity::prelude::*;

/// Persisted key/value option. Values are JSON documents.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ema_option")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub option_key: String,
    #[sea_orm(column_type = "Text")]
    pub value: String,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
