use std::time::Duration;

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectOptions, Database, EntityTrait, QueryFilter};
use serde_json::Value;

use crate::entity::queue_message::{Column, Entity};
use crate::transport::Mq;
use common::Payload;

pub async fn test_mq() -> Mq {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();

    let mq = Mq::new(db, Duration::from_secs(300));
    mq.install().await.unwrap();
    mq
}

pub async fn expire_lease(mq: &Mq, id: i32) {
    Entity::update_many()
        .col_expr(Column::LockedUntil, Expr::value(Some(0i64)))
        .filter(Column::Id.eq(id))
        .exec(mq.connection())
        .await
        .unwrap();
}

pub fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}
