use anyhow::Context;
use async_trait::async_trait;
use common::AppVersion;
use tracing::info;

use crate::updater::{UpdateContext, UpdateWorker};

const LEGACY_EXPORT_PREFIX: &str = "export-";
const EXPORT_PREFIX: &str = "subscribers-export-";

/// Titles for user messages, and the current naming of export files.
pub struct MessageTitles;

#[async_trait]
impl UpdateWorker for MessageTitles {
    fn version(&self) -> AppVersion {
        AppVersion::new(2, 0, 18)
    }

    async fn run(&self, ctx: &mut UpdateContext<'_>) -> anyhow::Result<()> {
        ctx.run_queries_from_sql_file().await?;

        // Renames are outside the transaction and must stay the last step. A
        // failed pass leaves renamed files in place; the retry renames the rest.
        let storage = ctx.storage();
        let mut renamed = 0;
        for name in storage.list().await.context("Cannot list queue storage")? {
            let Some(rest) = name.strip_prefix(LEGACY_EXPORT_PREFIX) else {
                continue;
            };
            if !rest.ends_with(".csv") {
                continue;
            }
            let target = format!("{EXPORT_PREFIX}{rest}");
            if storage
                .rename(&name, &target)
                .await
                .with_context(|| format!("Cannot rename {name} to {target}"))?
            {
                renamed += 1;
            }
        }

        if renamed > 0 {
            info!(renamed, "Renamed legacy export files");
        }
        Ok(())
    }
}
