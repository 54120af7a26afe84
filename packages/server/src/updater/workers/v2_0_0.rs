use async_trait::async_trait;
use common::AppVersion;

use crate::options::COUNT_HISTORY_ENABLED;
use crate::updater::{UpdateContext, UpdateWorker};

/// Hourly subscriber-count history. The history is filled by the worker's
/// scheduled run, which now has to be installed in cron.
pub struct SubscriberCountHistory;

#[async_trait]
impl UpdateWorker for SubscriberCountHistory {
    fn version(&self) -> AppVersion {
        AppVersion::new(2, 0, 0)
    }

    async fn run(&self, ctx: &mut UpdateContext<'_>) -> anyhow::Result<()> {
        ctx.run_queries_from_sql_file().await?;
        ctx.set_option(COUNT_HISTORY_ENABLED, &true).await?;
        ctx.notice(
            "Add the following line to the crontab: \
             * * * * * /usr/local/bin/worker drain >/dev/null 2>&1",
        );
        Ok(())
    }
}
