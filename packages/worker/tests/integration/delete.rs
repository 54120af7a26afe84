use common::storage::QueueStorage;
use common::topic::EXPORT_DELETE;
use serde_json::json;

use crate::common::TestWorker;

#[tokio::test]
async fn deletes_the_named_file() {
    let worker = TestWorker::spawn().await;
    worker
        .storage
        .write("subscribers-export-1.csv", b"email\n")
        .await
        .unwrap();
    worker.storage.write("keep.csv", b"email\n").await.unwrap();

    worker
        .send(EXPORT_DELETE, json!({ "fileName": "subscribers-export-1.csv" }))
        .await;

    assert_eq!(worker.drain().await.acked, 1);
    assert_eq!(worker.files().await, ["keep.csv"]);
}

#[tokio::test]
async fn missing_file_is_acked() {
    let worker = TestWorker::spawn().await;

    worker
        .send(EXPORT_DELETE, json!({ "fileName": "gone.csv" }))
        .await;

    let summary = worker.drain().await;
    assert_eq!(summary.acked, 1);
    assert!(worker.queued(EXPORT_DELETE).await.is_empty());
}

#[tokio::test]
async fn unsafe_or_missing_names_are_rejected() {
    let worker = TestWorker::spawn().await;

    worker
        .send(EXPORT_DELETE, json!({ "fileName": "../config.toml" }))
        .await;
    worker.send(EXPORT_DELETE, json!({})).await;

    let summary = worker.drain().await;
    assert_eq!(summary.rejected, 2);
    assert!(
        worker
            .queued(EXPORT_DELETE)
            .await
            .iter()
            .all(|m| m.status == "dead")
    );
}
