use std::sync::Arc;

use common::hook::HookRegistry;
use common::storage::QueueStorage;
use mq::Mq;
use sea_orm::DatabaseConnection;

/// Shared resources handed to every processor.
#[derive(Clone)]
pub struct WorkerContext {
    pub db: DatabaseConnection,
    pub mq: Mq,
    pub storage: Arc<dyn QueueStorage>,
    pub hooks: Arc<HookRegistry>,
}
