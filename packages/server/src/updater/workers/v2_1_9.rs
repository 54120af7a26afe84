use async_trait::async_trait;
use common::AppVersion;

use crate::updater::{UpdateContext, UpdateWorker};

pub struct TranslationIndex;

#[async_trait]
impl UpdateWorker for TranslationIndex {
    fn version(&self) -> AppVersion {
        AppVersion::new(2, 1, 9)
    }

    async fn run(&self, ctx: &mut UpdateContext<'_>) -> anyhow::Result<()> {
        ctx.run_queries_from_sql_file().await?;
        ctx.import_translations().await?;
        Ok(())
    }
}
