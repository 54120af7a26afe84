use async_trait::async_trait;
use common::AppVersion;

use crate::options::EXPORTER_PROCESS_AT_ONCE;
use crate::updater::{UpdateContext, UpdateWorker};

/// Users, customers, lists, subscribers, user messages and translation sources.
pub struct BaseSchema;

#[async_trait]
impl UpdateWorker for BaseSchema {
    fn version(&self) -> AppVersion {
        AppVersion::new(1, 0, 0)
    }

    async fn run(&self, ctx: &mut UpdateContext<'_>) -> anyhow::Result<()> {
        ctx.run_queries_from_sql_file().await?;
        ctx.set_option(EXPORTER_PROCESS_AT_ONCE, &500).await?;
        Ok(())
    }
}
