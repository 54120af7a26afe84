use axum::http::StatusCode;
use common::topic::{BACKEND_SUBSCRIBERS_EXPORT, CUSTOMER_LIST_SUBSCRIBERS_EXPORT};
use common::{DeadLetterReason, Payload};
use mq::entity::queue_message;
use sea_orm::EntityTrait;
use serde_json::json;

use server::notify;
use server::options::{self, CUSTOMER_EXPORTS_ENABLED};

use crate::common::{TestApp, routes};

mod update {
    use super::*;

    #[tokio::test]
    async fn status_lists_pending_versions() {
        let app = TestApp::spawn_uninstalled().await;

        let res = app.get(routes::UPDATE).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["db_version"], "0.0.0");
        assert_eq!(res.body["code_version"], "2.1.10");
        assert_eq!(res.body["pending"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn post_runs_pending_updates() {
        let app = TestApp::spawn_uninstalled().await;

        let res = app.post(routes::UPDATE).await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.text);
        assert_eq!(res.body["to"], "2.1.10");
        assert_eq!(res.body["applied"].as_array().unwrap().len(), 5);

        let res = app.get(routes::UPDATE).await;
        assert_eq!(res.body["db_version"], "2.1.10");
        assert!(res.body["pending"].as_array().unwrap().is_empty());
    }
}

mod subscribers {
    use super::*;

    async fn seeded() -> (TestApp, i32) {
        let app = TestApp::spawn().await;
        let customer_id = app.create_customer("owner@example.com").await;
        let list_id = app.create_list(customer_id, "Newsletter").await;
        app.create_subscriber(list_id, "ann@example.com", "confirmed").await;
        app.create_subscriber(list_id, "bob@example.org", "confirmed").await;
        app.create_subscriber(list_id, "cid@example.com", "unsubscribed").await;
        (app, list_id)
    }

    #[tokio::test]
    async fn search_issues_a_session_cookie() {
        let (app, _) = seeded().await;

        let res = app.get(routes::SUBSCRIBERS).await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.session_cookie().is_some());
        assert_eq!(res.body["pagination"]["total"], 3);
    }

    #[tokio::test]
    async fn filter_values_stick_to_the_session() {
        let (app, _) = seeded().await;

        let res = app
            .get(&format!("{}?email=example.com&status=confirmed", routes::SUBSCRIBERS))
            .await;
        let cookie = res.session_cookie().unwrap();
        assert_eq!(res.body["pagination"]["total"], 1);

        // No query: the stored filter applies.
        let res = app.get_with_cookie(routes::SUBSCRIBERS, &cookie).await;
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["email"], "ann@example.com");
        assert!(res.session_cookie().is_none());

        // New values win over stored ones.
        let res = app
            .get_with_cookie(&format!("{}?status=unsubscribed", routes::SUBSCRIBERS), &cookie)
            .await;
        assert_eq!(res.body["filter"]["status"], "unsubscribed");
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["email"], "cid@example.com");

        // A blank value clears the stored one.
        let res = app
            .get_with_cookie(&format!("{}?email=&status=", routes::SUBSCRIBERS), &cookie)
            .await;
        assert_eq!(res.body["pagination"]["total"], 3);

        // Other sessions are unaffected.
        let res = app.get(routes::SUBSCRIBERS).await;
        assert_eq!(res.body["pagination"]["total"], 3);
    }

    #[tokio::test]
    async fn pagination_is_applied() {
        let (app, _) = seeded().await;

        let res = app.get(&format!("{}?page=2&per_page=2", routes::SUBSCRIBERS)).await;
        assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
        assert_eq!(res.body["pagination"]["total_pages"], 2);

        let res = app.get(&format!("{}?page=x", routes::SUBSCRIBERS)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn largest_page_number_returns_an_empty_page() {
        let (app, _) = seeded().await;

        let res = app
            .get(&format!("{}?page={}&per_page=100", routes::SUBSCRIBERS, u64::MAX))
            .await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.text);
        assert!(res.body["data"].as_array().unwrap().is_empty());
        assert_eq!(res.body["pagination"]["page"], 1_000_000);
        assert_eq!(res.body["pagination"]["total"], 3);
    }

    #[tokio::test]
    async fn clearing_the_filter_forgets_stored_values() {
        let (app, _) = seeded().await;

        let res = app
            .get(&format!("{}?status=unsubscribed", routes::SUBSCRIBERS))
            .await;
        let cookie = res.session_cookie().unwrap();
        assert_eq!(res.body["pagination"]["total"], 1);

        let res = app.delete_with_cookie(routes::SUBSCRIBER_FILTER, &cookie).await;
        assert_eq!(res.status, StatusCode::NO_CONTENT);

        let res = app.get_with_cookie(routes::SUBSCRIBERS, &cookie).await;
        assert_eq!(res.body["pagination"]["total"], 3);
        assert!(res.body["filter"]["status"].is_null());

        // Without a session there is nothing to clear.
        let res = app.delete(routes::SUBSCRIBER_FILTER).await;
        assert_eq!(res.status, StatusCode::NO_CONTENT);
    }
}

mod exports {
    use super::*;

    async fn queued(app: &TestApp) -> Vec<queue_message::Model> {
        queue_message::Entity::find().all(&app.db).await.unwrap()
    }

    fn payload_of(message: &queue_message::Model) -> Payload {
        serde_json::from_str(&message.payload).unwrap()
    }

    #[tokio::test]
    async fn export_requires_an_acting_user() {
        let app = TestApp::spawn().await;

        let res = app.post(routes::SUBSCRIBERS_EXPORT).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);

        let res = app.post_as(routes::SUBSCRIBERS_EXPORT, 42).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert!(queued(&app).await.is_empty());
    }

    #[tokio::test]
    async fn export_carries_the_sticky_filter() {
        let app = TestApp::spawn().await;
        let user_id = app.create_user("admin@example.com").await;

        let res = app
            .get(&format!("{}?status=confirmed&page=3", routes::SUBSCRIBERS))
            .await;
        let cookie = res.session_cookie().unwrap();

        let res = app
            .request(
                axum::http::Method::POST,
                routes::SUBSCRIBERS_EXPORT,
                &[("X-User-Id", user_id.to_string()), ("Cookie", cookie)],
            )
            .await;
        assert_eq!(res.status, StatusCode::ACCEPTED, "{}", res.text);
        assert_eq!(res.body["topic"], BACKEND_SUBSCRIBERS_EXPORT);

        let messages = queued(&app).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].topic, BACKEND_SUBSCRIBERS_EXPORT);
        assert_eq!(
            payload_of(&messages[0]),
            json!({"status": "confirmed", "user_id": user_id})
                .as_object()
                .unwrap()
                .clone()
        );
    }

    #[tokio::test]
    async fn customer_export_checks_list_ownership() {
        let app = TestApp::spawn().await;
        let owner = app.create_customer("owner@example.com").await;
        let other = app.create_customer("other@example.com").await;
        let list_id = app.create_list(owner, "Newsletter").await;

        let res = app
            .post_as(&routes::customer_list_export(other, list_id), 1)
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);

        let res = app
            .post_as(
                &format!("{}?email=example&is_admin=1", routes::customer_list_export(owner, list_id)),
                1,
            )
            .await;
        assert_eq!(res.status, StatusCode::ACCEPTED, "{}", res.text);

        let messages = queued(&app).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].topic, CUSTOMER_LIST_SUBSCRIBERS_EXPORT);
        let payload = payload_of(&messages[0]);
        assert_eq!(payload["list_id"], list_id);
        assert_eq!(payload["customer_id"], owner);
        assert_eq!(payload["email"], "example");
        assert!(!payload.contains_key("is_admin"));
    }

    #[tokio::test]
    async fn customer_export_can_be_disabled() {
        let app = TestApp::spawn().await;
        let owner = app.create_customer("owner@example.com").await;
        let list_id = app.create_list(owner, "Newsletter").await;
        options::set(&app.db, CUSTOMER_EXPORTS_ENABLED, &false)
            .await
            .unwrap();

        let res = app
            .post_as(&routes::customer_list_export(owner, list_id), 1)
            .await;
        assert_eq!(res.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn download_streams_the_stored_file() {
        let app = TestApp::spawn().await;
        app.store_file("subscribers-export-1.csv", "email\nann@example.com\n")
            .await;

        let res = app.get(&routes::export_file("subscribers-export-1.csv")).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.text, "email\nann@example.com\n");
        assert!(
            res.headers["content-disposition"]
                .to_str()
                .unwrap()
                .contains("subscribers-export-1.csv")
        );

        let res = app.get(&routes::export_file("missing.csv")).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);

        let res = app.get(&routes::export_file(".hidden")).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn download_refuses_names_that_break_the_header() {
        let app = TestApp::spawn().await;

        for name in ["a%22.csv", "a.csv;filename=b.exe"] {
            let res = app.get(&routes::export_file(name)).await;
            assert_eq!(res.status, StatusCode::BAD_REQUEST, "{name}");
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
            assert!(res.headers.get("content-disposition").is_none());
        }
    }
}

mod messages {
    use super::*;

    #[tokio::test]
    async fn lists_own_messages_newest_first() {
        let app = TestApp::spawn().await;
        let me = app.create_user("me@example.com").await;
        let other = app.create_user("other@example.com").await;

        notify::notify_user(&app.db, me, "First".into(), "a".into())
            .await
            .unwrap();
        notify::notify_user(&app.db, me, "Second".into(), "b".into())
            .await
            .unwrap();
        notify::notify_user(&app.db, other, "Theirs".into(), "c".into())
            .await
            .unwrap();

        let res = app.get_as(routes::MESSAGES, me).await;
        assert_eq!(res.status, StatusCode::OK);
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["title"], "Second");
        assert_eq!(data[1]["status"], "unseen");
    }
}

mod queue {
    use super::*;

    #[tokio::test]
    async fn dead_letters_can_be_listed_and_retried() {
        let app = TestApp::spawn().await;
        let id = app
            .mq
            .send("no.such.topic", &Payload::new(), &Default::default(), 0)
            .await
            .unwrap();
        let message = app.mq.receive().await.unwrap().unwrap();
        app.mq
            .reject(&message, DeadLetterReason::UnknownTopic, "no processor")
            .await
            .unwrap();

        let res = app.get(routes::DEAD_LETTERS).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["data"][0]["id"], id);
        assert_eq!(res.body["data"][0]["reason"], "UNKNOWN_TOPIC");
        assert_eq!(res.body["stats"]["total"], 1);

        let res = app.post(&routes::dead_letter_retry(id)).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["requeued"], true);

        let res = app.post(&routes::dead_letter_retry(id)).await;
        assert_eq!(res.status, StatusCode::CONFLICT);

        let res = app.post(&routes::dead_letter_retry(9999)).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }

    async fn dead_letter(app: &TestApp, topic: &str, reason: DeadLetterReason) {
        app.mq
            .send(topic, &Payload::new(), &Default::default(), 0)
            .await
            .unwrap();
        let message = app.mq.receive().await.unwrap().unwrap();
        app.mq.reject(&message, reason, "failed").await.unwrap();
    }

    #[tokio::test]
    async fn dead_letters_can_be_purged_by_reason() {
        let app = TestApp::spawn().await;
        dead_letter(&app, "no.such.topic", DeadLetterReason::UnknownTopic).await;
        dead_letter(&app, "backend.subscribers.export", DeadLetterReason::Rejected).await;

        let res = app
            .delete(&format!("{}?reason=UNKNOWN_TOPIC", routes::DEAD_LETTERS))
            .await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.text);
        assert_eq!(res.body["deleted"], 1);

        let res = app.get(routes::DEAD_LETTERS).await;
        assert_eq!(res.body["stats"]["total"], 1);
        assert_eq!(res.body["data"][0]["reason"], "REJECTED");

        let res = app.delete(routes::DEAD_LETTERS).await;
        assert_eq!(res.body["deleted"], 1);

        let res = app
            .get(&format!("{}?page={}", routes::DEAD_LETTERS, u64::MAX))
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["stats"]["total"], 0);
    }
}
