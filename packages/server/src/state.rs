use std::sync::Arc;

use common::hook::HookRegistry;
use common::storage::QueueStorage;
use mq::Mq;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::filters::SessionStore;
use crate::updater::Updater;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub mq: Mq,
    pub storage: Arc<dyn QueueStorage>,
    pub sessions: Arc<dyn SessionStore>,
    pub hooks: Arc<HookRegistry>,
    pub updater: Arc<Updater>,
    pub config: Arc<AppConfig>,
}
