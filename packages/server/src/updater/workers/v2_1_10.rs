use async_trait::async_trait;
use common::AppVersion;

use crate::options::CUSTOMER_EXPORTS_ENABLED;
use crate::updater::{UpdateContext, UpdateWorker};

/// Customer notifications, needed by customer list exports.
pub struct CustomerMessages;

#[async_trait]
impl UpdateWorker for CustomerMessages {
    fn version(&self) -> AppVersion {
        AppVersion::new(2, 1, 10)
    }

    async fn run(&self, ctx: &mut UpdateContext<'_>) -> anyhow::Result<()> {
        ctx.run_queries_from_sql_file().await?;
        ctx.set_option(CUSTOMER_EXPORTS_ENABLED, &true).await?;
        Ok(())
    }
}
