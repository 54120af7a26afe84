use chrono::{Duration, Utc};
use common::topic::LIST_SUBSCRIBER_COUNT_HISTORY_UPDATE;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde_json::json;
use server::entity::list_subscriber_count_history as history;
use server::options::COUNT_HISTORY_ENABLED;
use worker::handlers::count_history::{hour_bucket, record_list};
use worker::schedule_count_history;

use crate::common::TestWorker;

async fn history_of(worker: &TestWorker, list_id: i32) -> Vec<history::Model> {
    history::Entity::find()
        .filter(history::Column::ListId.eq(list_id))
        .order_by_asc(history::Column::CreatedAt)
        .all(worker.db())
        .await
        .unwrap()
}

#[tokio::test]
async fn counts_confirmed_subscribers_per_hour() {
    let worker = TestWorker::spawn().await;
    let customer_id = worker.create_customer("owner@example.com").await;
    let list_id = worker.create_list(customer_id, "News").await;
    worker.create_subscriber(list_id, "a@example.com", "confirmed").await;
    worker.create_subscriber(list_id, "b@example.com", "confirmed").await;
    worker.create_subscriber(list_id, "c@example.com", "unconfirmed").await;

    let now = Utc::now();
    assert_eq!(record_list(worker.db(), list_id, now).await.unwrap(), (2, 2));

    // Same hour again: the bucket is updated in place.
    worker.create_subscriber(list_id, "d@example.com", "confirmed").await;
    assert_eq!(record_list(worker.db(), list_id, now).await.unwrap(), (3, 3));

    let rows = history_of(&worker, list_id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].created_at, hour_bucket(now));
}

#[tokio::test]
async fn hourly_total_is_the_change_since_the_previous_bucket() {
    let worker = TestWorker::spawn().await;
    let customer_id = worker.create_customer("owner@example.com").await;
    let list_id = worker.create_list(customer_id, "News").await;
    worker.create_subscriber(list_id, "a@example.com", "confirmed").await;

    let now = Utc::now();
    history::ActiveModel {
        list_id: Set(list_id),
        total: Set(5),
        hourly_total: Set(5),
        created_at: Set(hour_bucket(now) - Duration::hours(2)),
        ..Default::default()
    }
    .insert(worker.db())
    .await
    .unwrap();

    assert_eq!(record_list(worker.db(), list_id, now).await.unwrap(), (1, -4));
    assert_eq!(history_of(&worker, list_id).await.len(), 2);
}

#[tokio::test]
async fn processor_records_every_list_when_enabled() {
    let worker = TestWorker::spawn().await;
    let customer_id = worker.create_customer("owner@example.com").await;
    let first = worker.create_list(customer_id, "First").await;
    let second = worker.create_list(customer_id, "Second").await;
    worker.create_subscriber(first, "a@example.com", "confirmed").await;

    worker
        .send(LIST_SUBSCRIBER_COUNT_HISTORY_UPDATE, json!({}))
        .await;
    assert_eq!(worker.drain().await.acked, 1);

    assert_eq!(history_of(&worker, first).await[0].total, 1);
    assert_eq!(history_of(&worker, second).await[0].total, 0);
}

#[tokio::test]
async fn processor_can_target_one_list() {
    let worker = TestWorker::spawn().await;
    let customer_id = worker.create_customer("owner@example.com").await;
    let first = worker.create_list(customer_id, "First").await;
    let second = worker.create_list(customer_id, "Second").await;

    worker
        .send(LIST_SUBSCRIBER_COUNT_HISTORY_UPDATE, json!({ "list_id": second }))
        .await;
    assert_eq!(worker.drain().await.acked, 1);

    assert!(history_of(&worker, first).await.is_empty());
    assert_eq!(history_of(&worker, second).await.len(), 1);
}

#[tokio::test]
async fn processor_does_nothing_when_disabled() {
    let worker = TestWorker::spawn().await;
    worker.set_option(COUNT_HISTORY_ENABLED, false).await;
    let customer_id = worker.create_customer("owner@example.com").await;
    let list_id = worker.create_list(customer_id, "News").await;

    worker
        .send(LIST_SUBSCRIBER_COUNT_HISTORY_UPDATE, json!({}))
        .await;
    assert_eq!(worker.drain().await.acked, 1);
    assert!(history_of(&worker, list_id).await.is_empty());
}

#[tokio::test]
async fn scheduling_keeps_a_single_pending_job() {
    let worker = TestWorker::spawn().await;

    let first = schedule_count_history(&worker.ctx).await.unwrap();
    assert!(first.is_some());
    assert_eq!(schedule_count_history(&worker.ctx).await.unwrap(), None);
    assert_eq!(
        worker.queued(LIST_SUBSCRIBER_COUNT_HISTORY_UPDATE).await.len(),
        1
    );

    worker.drain().await;
    assert!(schedule_count_history(&worker.ctx).await.unwrap().is_some());
}

#[tokio::test]
async fn scheduling_is_skipped_when_disabled() {
    let worker = TestWorker::spawn().await;
    worker.set_option(COUNT_HISTORY_ENABLED, false).await;

    assert_eq!(schedule_count_history(&worker.ctx).await.unwrap(), None);
    assert!(
        worker
            .queued(LIST_SUBSCRIBER_COUNT_HISTORY_UPDATE)
            .await
            .is_empty()
    );
}
