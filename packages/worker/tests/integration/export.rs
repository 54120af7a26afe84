use common::event::GenericEvent;
use common::hook::{HookAction, HookOptions, HookRegistry};
use common::topic::{
    BACKEND_SUBSCRIBERS_EXPORT, CUSTOMER_LIST_SUBSCRIBERS_EXPORT, EXPORT_CLEANUP_DELAY_MS,
    EXPORT_DELETE, HOOK_EXPORT_SUBSCRIBER_ROW,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use server::entity::{customer_message, user_message};
use server::options::{CUSTOMER_EXPORTS_ENABLED, EXPORTER_PROCESS_AT_ONCE};

use crate::common::TestWorker;

fn data_lines(csv: &str) -> Vec<&str> {
    csv.lines().skip(1).collect()
}

#[tokio::test]
async fn backend_export_writes_matching_rows_and_notifies() {
    let worker = TestWorker::spawn().await;
    worker.set_option(EXPORTER_PROCESS_AT_ONCE, 1).await;
    let user_id = worker.create_user("admin@example.com").await;
    let customer_id = worker.create_customer("owner@example.com").await;
    let list_id = worker.create_list(customer_id, "News").await;
    worker.create_subscriber(list_id, "a@example.com", "confirmed").await;
    worker.create_subscriber(list_id, "b@example.com", "unsubscribed").await;
    worker.create_subscriber(list_id, "c@example.com", "confirmed").await;
    worker.create_subscriber(list_id, "d@example.com", "confirmed").await;

    worker
        .send(
            BACKEND_SUBSCRIBERS_EXPORT,
            json!({ "user_id": user_id, "status": "confirmed" }),
        )
        .await;
    let summary = worker.drain().await;
    assert_eq!(summary.acked, 1);

    let files = worker.files().await;
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("subscribers-export-"));
    assert!(files[0].ends_with(".csv"));

    let csv = worker.read_file(&files[0]).await;
    assert_eq!(
        csv.lines().next(),
        Some("email,status,source,ip_address,list_id,date_added")
    );
    let emails: Vec<&str> = data_lines(&csv)
        .iter()
        .map(|line| line.split(',').next().unwrap())
        .collect();
    assert_eq!(emails, ["a@example.com", "c@example.com", "d@example.com"]);

    let messages = user_message::Entity::find()
        .filter(user_message::Column::UserId.eq(user_id))
        .all(worker.db())
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].message.contains("3 subscribers"));
    assert!(messages[0].message.contains(&files[0]));
}

#[tokio::test]
async fn export_schedules_cleanup_a_day_later() {
    let worker = TestWorker::spawn().await;
    let user_id = worker.create_user("admin@example.com").await;

    worker
        .send(BACKEND_SUBSCRIBERS_EXPORT, json!({ "user_id": user_id }))
        .await;
    worker.drain().await;

    let files = worker.files().await;
    let cleanup = worker.queued(EXPORT_DELETE).await;
    assert_eq!(cleanup.len(), 1);
    assert_eq!(
        cleanup[0].available_at - cleanup[0].published_at,
        EXPORT_CLEANUP_DELAY_MS as i64
    );
    assert_eq!(cleanup[0].status, "pending");

    let payload: serde_json::Value = serde_json::from_str(&cleanup[0].payload).unwrap();
    assert_eq!(payload["fileName"], files[0].as_str());

    // Not due yet.
    assert_eq!(worker.drain().await.total(), 0);
    assert_eq!(worker.files().await, files);
}

#[tokio::test]
async fn export_for_deleted_user_is_dropped() {
    let worker = TestWorker::spawn().await;

    worker
        .send(BACKEND_SUBSCRIBERS_EXPORT, json!({ "user_id": 4242 }))
        .await;
    let summary = worker.drain().await;

    assert_eq!(summary.acked, 1);
    assert!(worker.files().await.is_empty());
    assert!(worker.queued(EXPORT_DELETE).await.is_empty());
}

#[tokio::test]
async fn export_without_user_is_rejected() {
    let worker = TestWorker::spawn().await;

    let id = worker
        .send(BACKEND_SUBSCRIBERS_EXPORT, json!({ "status": "confirmed" }))
        .await;
    let summary = worker.drain().await;

    assert_eq!(summary.rejected, 1);
    let rows = worker.queued(BACKEND_SUBSCRIBERS_EXPORT).await;
    assert_eq!(rows[0].id, id);
    assert_eq!(rows[0].status, "dead");
}

#[tokio::test]
async fn redelivered_export_is_acked_without_side_effects() {
    let worker = TestWorker::spawn().await;
    let user_id = worker.create_user("admin@example.com").await;

    let id = worker
        .send(BACKEND_SUBSCRIBERS_EXPORT, json!({ "user_id": user_id }))
        .await;
    worker.abandon_delivery(id).await;

    let summary = worker.drain().await;
    assert_eq!(summary.acked, 1);
    assert!(worker.queued(BACKEND_SUBSCRIBERS_EXPORT).await.is_empty());
    assert!(worker.files().await.is_empty());
    assert!(worker.queued(EXPORT_DELETE).await.is_empty());

    let messages = user_message::Entity::find()
        .filter(user_message::Column::UserId.eq(user_id))
        .all(worker.db())
        .await
        .unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn row_hook_rewrites_and_drops_rows() {
    let mut hooks = HookRegistry::new();
    hooks.add_fn(
        "mask",
        HOOK_EXPORT_SUBSCRIBER_ROW,
        HookOptions::default(),
        |_scope, event: &GenericEvent| {
            let email = event.payload["values"][0].as_str().unwrap_or_default();
            if email.starts_with("drop") {
                return Ok(HookAction::Stop);
            }
            let mut modified = event.clone();
            modified.payload["values"][0] = json!(email.to_uppercase());
            Ok(HookAction::Modified(modified))
        },
    );

    let worker = TestWorker::spawn_with_hooks(hooks).await;
    let user_id = worker.create_user("admin@example.com").await;
    let customer_id = worker.create_customer("owner@example.com").await;
    let list_id = worker.create_list(customer_id, "News").await;
    worker.create_subscriber(list_id, "keep@example.com", "confirmed").await;
    worker.create_subscriber(list_id, "drop@example.com", "confirmed").await;

    worker
        .send(BACKEND_SUBSCRIBERS_EXPORT, json!({ "user_id": user_id }))
        .await;
    assert_eq!(worker.drain().await.acked, 1);

    let files = worker.files().await;
    let csv = worker.read_file(&files[0]).await;
    let rows = data_lines(&csv);
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("KEEP@EXAMPLE.COM,confirmed,web,,"));
}

#[tokio::test]
async fn failing_rows_are_left_out_of_the_export() {
    let mut hooks = HookRegistry::new();
    hooks.add_fn(
        "guard",
        HOOK_EXPORT_SUBSCRIBER_ROW,
        HookOptions::default(),
        |_scope, event: &GenericEvent| {
            match event.payload["values"][0].as_str().unwrap_or_default() {
                "rejected@example.com" => Ok(HookAction::Reject("blocked address".into())),
                "broken@example.com" => Err(anyhow::anyhow!("lookup failed")),
                _ => Ok(HookAction::Pass),
            }
        },
    );

    let worker = TestWorker::spawn_with_hooks(hooks).await;
    let user_id = worker.create_user("admin@example.com").await;
    let customer_id = worker.create_customer("owner@example.com").await;
    let list_id = worker.create_list(customer_id, "News").await;
    worker.create_subscriber(list_id, "rejected@example.com", "confirmed").await;
    worker.create_subscriber(list_id, "kept@example.com", "confirmed").await;
    worker.create_subscriber(list_id, "broken@example.com", "confirmed").await;

    worker
        .send(BACKEND_SUBSCRIBERS_EXPORT, json!({ "user_id": user_id }))
        .await;
    let summary = worker.drain().await;
    assert_eq!(summary.acked, 1);
    assert_eq!(summary.rejected, 0);

    let files = worker.files().await;
    let csv = worker.read_file(&files[0]).await;
    let rows = data_lines(&csv);
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("kept@example.com,"));

    let messages = user_message::Entity::find()
        .filter(user_message::Column::UserId.eq(user_id))
        .all(worker.db())
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].message.starts_with("1 subscribers were exported"));
}

#[tokio::test]
async fn customer_export_covers_only_the_owned_list() {
    let worker = TestWorker::spawn().await;
    let customer_id = worker.create_customer("owner@example.com").await;
    let list_id = worker.create_list(customer_id, "Mine").await;
    let other_list = worker.create_list(customer_id, "Other").await;
    worker.create_subscriber(list_id, "a@example.com", "confirmed").await;
    worker.create_subscriber(other_list, "b@example.com", "confirmed").await;

    worker
        .send(
            CUSTOMER_LIST_SUBSCRIBERS_EXPORT,
            json!({ "customer_id": customer_id, "list_id": list_id }),
        )
        .await;
    assert_eq!(worker.drain().await.acked, 1);

    let files = worker.files().await;
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with(&format!("list-{list_id}-subscribers-")));
    let csv = worker.read_file(&files[0]).await;
    let rows = data_lines(&csv);
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("a@example.com,"));

    let messages = customer_message::Entity::find()
        .filter(customer_message::Column::CustomerId.eq(customer_id))
        .all(worker.db())
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].message.contains("1 subscribers"));
    assert_eq!(worker.queued(EXPORT_DELETE).await.len(), 1);
}

#[tokio::test]
async fn customer_export_of_foreign_list_is_dropped() {
    let worker = TestWorker::spawn().await;
    let owner = worker.create_customer("owner@example.com").await;
    let intruder = worker.create_customer("intruder@example.com").await;
    let list_id = worker.create_list(owner, "Mine").await;
    worker.create_subscriber(list_id, "a@example.com", "confirmed").await;

    worker
        .send(
            CUSTOMER_LIST_SUBSCRIBERS_EXPORT,
            json!({ "customer_id": intruder, "list_id": list_id }),
        )
        .await;

    assert_eq!(worker.drain().await.acked, 1);
    assert!(worker.files().await.is_empty());
}

#[tokio::test]
async fn customer_export_is_dropped_when_disabled() {
    let worker = TestWorker::spawn().await;
    worker.set_option(CUSTOMER_EXPORTS_ENABLED, false).await;
    let customer_id = worker.create_customer("owner@example.com").await;
    let list_id = worker.create_list(customer_id, "Mine").await;

    worker
        .send(
            CUSTOMER_LIST_SUBSCRIBERS_EXPORT,
            json!({ "customer_id": customer_id, "list_id": list_id }),
        )
        .await;

    assert_eq!(worker.drain().await.acked, 1);
    assert!(worker.files().await.is_empty());
    assert!(worker.queued(EXPORT_DELETE).await.is_empty());
}
