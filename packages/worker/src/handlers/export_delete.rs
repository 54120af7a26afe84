use async_trait::async_trait;
use common::hook::HookScope;
use common::payload::payload_str;
use common::storage::{StorageError, validate_name};
use common::topic::EXPORT_DELETE;
use mq::{Outcome, Processor, QueueMessage};
use tracing::{info, instrument};

use crate::context::WorkerContext;
use crate::export::FILE_NAME_KEY;

/// Removes an export file from queue storage.
pub struct ExportDelete;

#[async_trait]
impl Processor<WorkerContext> for ExportDelete {
    fn topic(&self) -> &'static str {
        EXPORT_DELETE
    }

    #[instrument(skip_all, fields(id = message.id))]
    async fn process(
        &self,
        ctx: &WorkerContext,
        message: &QueueMessage,
        _scope: &HookScope,
    ) -> anyhow::Result<Outcome> {
        let Some(file_name) = payload_str(&message.payload, FILE_NAME_KEY) else {
            return Ok(Outcome::Reject(format!("Payload has no {FILE_NAME_KEY}")));
        };
        if let Err(e) = validate_name(file_name) {
            return Ok(Outcome::Reject(e.message().to_string()));
        }

        match ctx.storage.delete(file_name).await {
            Ok(true) => info!(file_name, "Export file deleted"),
            Ok(false) => info!(file_name, "Export file already gone"),
            Err(StorageError::InvalidName(e)) => {
                return Ok(Outcome::Reject(e.message().to_string()));
            }
            Err(e) => return Err(e.into()),
        }
        Ok(Outcome::Ack)
    }
}
