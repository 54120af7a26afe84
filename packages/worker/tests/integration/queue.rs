use common::storage::QueueStorage;
use common::topic::{
    BACKEND_SUBSCRIBERS_EXPORT, CUSTOMER_LIST_SUBSCRIBERS_EXPORT, EXPORT_DELETE,
    LIST_SUBSCRIBER_COUNT_HISTORY_UPDATE,
};
use mq::DispatchError;
use serde_json::json;
use worker::handlers::ExportDelete;

use crate::common::TestWorker;

#[test]
fn every_topic_has_one_processor() {
    let dispatcher = worker::dispatcher().unwrap();
    let mut expected = vec![
        BACKEND_SUBSCRIBERS_EXPORT,
        CUSTOMER_LIST_SUBSCRIBERS_EXPORT,
        EXPORT_DELETE,
        LIST_SUBSCRIBER_COUNT_HISTORY_UPDATE,
    ];
    expected.sort_unstable();
    assert_eq!(dispatcher.topics(), expected);

    assert!(matches!(
        dispatcher.with(ExportDelete),
        Err(DispatchError::DuplicateTopic(t)) if t == EXPORT_DELETE
    ));
}

#[tokio::test]
async fn unknown_topic_is_dead_lettered() {
    let worker = TestWorker::spawn().await;

    worker.send("list.import", json!({ "list_id": 1 })).await;
    let summary = worker.drain().await;

    assert_eq!(summary.dead_lettered, 1);
    assert_eq!(worker.queued("list.import").await[0].status, "dead");
}

#[tokio::test]
async fn redelivered_cleanup_leaves_the_file() {
    let worker = TestWorker::spawn().await;
    worker
        .storage
        .write("subscribers-export-1.csv", b"email\n")
        .await
        .unwrap();

    let id = worker
        .send(EXPORT_DELETE, json!({ "fileName": "subscribers-export-1.csv" }))
        .await;
    worker.abandon_delivery(id).await;

    assert_eq!(worker.drain().await.acked, 1);
    assert_eq!(worker.files().await, ["subscribers-export-1.csv"]);
}
