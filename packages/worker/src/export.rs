//! CSV export of list subscribers into queue storage.

use anyhow::Context;
use common::event::Event;
use common::hook::{HookAction, HookScope};
use common::topic::{EXPORT_CLEANUP_DELAY_MS, EXPORT_DELETE, HOOK_EXPORT_SUBSCRIBER_ROW};
use common::{Headers, Payload};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use server::entity::list_subscriber::{self, Column, Entity};
use server::filters::SubscriberSearch;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::context::WorkerContext;

pub const HEADER: &[&str] = &["email", "status", "source", "ip_address", "list_id", "date_added"];

/// Payload key of the file name in `export.delete` messages.
pub const FILE_NAME_KEY: &str = "fileName";

/// One CSV row, passed through the `export.subscriber.row` filter hook.
///
/// Hooks may rewrite `values` (`Modified`) or drop the row (`Stop`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub subscriber_id: i32,
    pub list_id: i32,
    pub values: Vec<String>,
}

impl Event for ExportRow {
    fn topic(&self) -> &str {
        HOOK_EXPORT_SUBSCRIBER_ROW
    }
}

impl From<&list_subscriber::Model> for ExportRow {
    fn from(s: &list_subscriber::Model) -> Self {
        Self {
            subscriber_id: s.id,
            list_id: s.list_id,
            values: vec![
                s.email.clone(),
                s.status.clone(),
                s.source.clone(),
                s.ip_address.clone().unwrap_or_default(),
                s.list_id.to_string(),
                s.created_at.to_rfc3339(),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub rows: u64,
    pub skipped: u64,
    pub bytes: u64,
}

/// Stream every subscriber matching `search` into `file_name`.
///
/// Subscribers are read in id order, `batch_size` at a time, each batch
/// continuing after the last id of the previous one. A row that fails in the
/// row hook is logged and left out. When reading fails the partial file is
/// removed.
pub async fn export_subscribers(
    ctx: &WorkerContext,
    scope: &HookScope,
    search: &SubscriberSearch,
    batch_size: u64,
    file_name: &str,
) -> anyhow::Result<ExportStats> {
    let batch_size = batch_size.max(1);
    let (mut writer, reader) = tokio::io::duplex(64 * 1024);

    let store = ctx.storage.write_stream(file_name, Box::new(reader));
    let produce = async move {
        let result = write_rows(ctx, scope, search, batch_size, &mut writer).await;
        // Dropping the writer ends the stream even if shutdown fails.
        let _ = writer.shutdown().await;
        result
    };

    let (stored, produced) = tokio::join!(store, produce);
    let bytes = stored.with_context(|| format!("Failed to store {file_name}"))?;

    let (rows, skipped) = match produced {
        Ok(counts) => counts,
        Err(e) => {
            if let Err(cleanup) = ctx.storage.delete(file_name).await {
                warn!(file_name, error = %cleanup, "Failed to remove partial export");
            }
            return Err(e);
        }
    };

    info!(file_name, rows, skipped, bytes, "Export written");
    Ok(ExportStats {
        rows,
        skipped,
        bytes,
    })
}

async fn write_rows<W: AsyncWrite + Unpin>(
    ctx: &WorkerContext,
    scope: &HookScope,
    search: &SubscriberSearch,
    batch_size: u64,
    out: &mut W,
) -> anyhow::Result<(u64, u64)> {
    let mut csv = csv::Writer::from_writer(Vec::new());
    csv.write_record(HEADER)?;
    out.write_all(&into_bytes(csv)?).await?;

    let mut last_id = 0;
    let (mut rows, mut skipped) = (0u64, 0u64);
    loop {
        let batch = search
            .apply(Entity::find())
            .filter(Column::Id.gt(last_id))
            .order_by_asc(Column::Id)
            .limit(batch_size)
            .all(&ctx.db)
            .await
            .context("Failed to read subscribers")?;
        let Some(last) = batch.last() else {
            break;
        };
        last_id = last.id;
        debug!(last_id, size = batch.len(), "Exporting batch");

        let mut csv = csv::Writer::from_writer(Vec::new());
        for subscriber in &batch {
            match filter_row(ctx, scope, ExportRow::from(subscriber)).await {
                Ok(Some(values)) => {
                    if let Err(e) = csv.write_record(&values) {
                        warn!(subscriber_id = subscriber.id, error = %e, "Skipping row");
                        skipped += 1;
                    } else {
                        rows += 1;
                    }
                }
                Ok(None) => skipped += 1,
                Err(e) => {
                    warn!(subscriber_id = subscriber.id, error = %e, "Skipping row");
                    skipped += 1;
                }
            }
        }
        out.write_all(&into_bytes(csv)?).await?;

        if (batch.len() as u64) < batch_size {
            break;
        }
    }

    Ok((rows, skipped))
}

/// Values to write for a row, or `None` if a hook dropped it.
async fn filter_row(
    ctx: &WorkerContext,
    scope: &HookScope,
    row: ExportRow,
) -> anyhow::Result<Option<Vec<String>>> {
    Ok(match ctx.hooks.trigger(scope, &row).await? {
        HookAction::Modified(row) => Some(row.values),
        HookAction::Stop => None,
        // `trigger` turns rejections into errors; treat one the same way.
        HookAction::Reject(_) => None,
        HookAction::Pass | HookAction::Chain(_) => Some(row.values),
    })
}

fn into_bytes(csv: csv::Writer<Vec<u8>>) -> anyhow::Result<Vec<u8>> {
    csv.into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV buffer: {}", e.error()))
}

/// Queue deletion of an export file once it has been available for 24 hours.
pub async fn schedule_cleanup(ctx: &WorkerContext, file_name: &str) -> Result<i32, mq::MqError> {
    let mut payload = Payload::new();
    payload.insert(FILE_NAME_KEY.into(), file_name.into());
    ctx.mq
        .send(EXPORT_DELETE, &payload, &Headers::new(), EXPORT_CLEANUP_DELAY_MS)
        .await
}

/// Path the export can be downloaded from.
pub fn download_url(file_name: &str) -> String {
    format!("/api/v1/exports/{file_name}")
}
