use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::hook::HookRegistry;
use common::storage::{FilesystemQueueStorage, QueueStorage};
use common::{Headers, Payload};
use mq::entity::queue_message;
use mq::{ConsumeConfig, Consumer, DrainSummary, Mq};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use serde_json::Value;
use tempfile::TempDir;

use server::entity::{customer, list, list_subscriber, user};
use server::updater::{UpdateRegistry, Updater};
use worker::WorkerContext;

pub fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

/// A worker over an in-memory database with every bundled update applied.
pub struct TestWorker {
    pub ctx: WorkerContext,
    pub consumer: Consumer<WorkerContext>,
    pub storage: Arc<FilesystemQueueStorage>,
    _storage_dir: TempDir,
}

impl TestWorker {
    pub async fn spawn() -> Self {
        Self::spawn_with_hooks(HookRegistry::new()).await
    }

    pub async fn spawn_with_hooks(hooks: HookRegistry) -> Self {
        let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
        opt.max_connections(1).sqlx_logging(false);
        let db = Database::connect(opt)
            .await
            .expect("Failed to open in-memory database");

        let mq = Mq::new(db.clone(), Duration::from_secs(300));
        mq.install().await.expect("Failed to install queue");

        let dir = tempfile::tempdir().expect("Failed to create storage dir");
        let storage = Arc::new(
            FilesystemQueueStorage::new(dir.path().to_path_buf(), 1 << 20)
                .await
                .expect("Failed to open storage"),
        );
        let hooks = Arc::new(hooks);

        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..");
        Updater::new(
            db.clone(),
            UpdateRegistry::bundled().expect("Bundled workers are ordered"),
            root.join("install-sql"),
            root.join("translations"),
            storage.clone(),
            hooks.clone(),
        )
        .run()
        .await
        .expect("Failed to install schema");

        let ctx = WorkerContext {
            db,
            mq: mq.clone(),
            storage: storage.clone(),
            hooks,
        };
        let consumer = Consumer::new(
            mq,
            worker::dispatcher().expect("Processors register once"),
            ConsumeConfig::default(),
        );

        Self {
            ctx,
            consumer,
            storage,
            _storage_dir: dir,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.ctx.db
    }

    pub async fn send(&self, topic: &str, body: Value) -> i32 {
        self.ctx
            .mq
            .send(topic, &payload(body), &Headers::new(), 0)
            .await
            .expect("Failed to send message")
    }

    pub async fn drain(&self) -> DrainSummary {
        self.consumer
            .drain(&self.ctx)
            .await
            .expect("Failed to drain queue")
    }

    /// Claim a message and let its lease run out, so the next delivery is
    /// flagged as redelivered.
    pub async fn abandon_delivery(&self, id: i32) {
        let message = self
            .ctx
            .mq
            .receive()
            .await
            .expect("Failed to receive")
            .expect("Message is visible");
        assert_eq!(message.id, id);

        queue_message::Entity::update_many()
            .col_expr(queue_message::Column::LockedUntil, Expr::value(Some(0i64)))
            .filter(queue_message::Column::Id.eq(id))
            .exec(self.db())
            .await
            .expect("Failed to expire lease");
    }

    pub async fn queued(&self, topic: &str) -> Vec<queue_message::Model> {
        queue_message::Entity::find()
            .filter(queue_message::Column::Topic.eq(topic))
            .all(self.db())
            .await
            .expect("Failed to read queue")
    }

    pub async fn set_option<T: serde::Serialize>(&self, key: &str, value: T) {
        server::options::set(self.db(), key, &value)
            .await
            .expect("Failed to set option");
    }

    pub async fn files(&self) -> Vec<String> {
        self.storage.list().await.expect("Failed to list storage")
    }

    pub async fn read_file(&self, name: &str) -> String {
        let bytes = self.storage.read(name).await.expect("Failed to read file");
        String::from_utf8(bytes).expect("File is UTF-8")
    }

    pub async fn create_user(&self, email: &str) -> i32 {
        user::ActiveModel {
            email: Set(email.to_string()),
            first_name: Set(None),
            last_name: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("Failed to create user")
        .id
    }

    pub async fn create_customer(&self, email: &str) -> i32 {
        customer::ActiveModel {
            email: Set(email.to_string()),
            first_name: Set(None),
            last_name: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("Failed to create customer")
        .id
    }

    pub async fn create_list(&self, customer_id: i32, name: &str) -> i32 {
        list::ActiveModel {
            customer_id: Set(customer_id),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("Failed to create list")
        .id
    }

    pub async fn create_subscriber(&self, list_id: i32, email: &str, status: &str) -> i32 {
        list_subscriber::ActiveModel {
            list_id: Set(list_id),
            email: Set(email.to_string()),
            status: Set(status.to_string()),
            source: Set("web".to_string()),
            ip_address: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("Failed to create subscriber")
        .id
    }
}
