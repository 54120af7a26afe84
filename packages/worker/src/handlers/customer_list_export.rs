use async_trait::async_trait;
use common::hook::HookScope;
use common::payload::payload_i64;
use common::topic::CUSTOMER_LIST_SUBSCRIBERS_EXPORT;
use mq::{Outcome, Processor, QueueMessage};
use sea_orm::EntityTrait;
use server::entity::{customer, list};
use server::filters::SubscriberSearch;
use server::notify::{self, EXPORT_READY};
use server::options::{self, CUSTOMER_EXPORTS_ENABLED, EXPORTER_PROCESS_AT_ONCE};
use tracing::{info, instrument};

use crate::context::WorkerContext;
use crate::export::{download_url, export_subscribers, schedule_cleanup};

/// Exports one list on behalf of the customer that owns it.
pub struct CustomerListExport;

fn id(message: &QueueMessage, key: &str) -> Option<i32> {
    payload_i64(&message.payload, key).and_then(|id| i32::try_from(id).ok())
}

#[async_trait]
impl Processor<WorkerContext> for CustomerListExport {
    fn topic(&self) -> &'static str {
        CUSTOMER_LIST_SUBSCRIBERS_EXPORT
    }

    #[instrument(skip_all, fields(id = message.id))]
    async fn process(
        &self,
        ctx: &WorkerContext,
        message: &QueueMessage,
        scope: &HookScope,
    ) -> anyhow::Result<Outcome> {
        let (Some(customer_id), Some(list_id)) =
            (id(message, "customer_id"), id(message, "list_id"))
        else {
            return Ok(Outcome::Reject(
                "Payload has no valid customer_id or list_id".into(),
            ));
        };

        if !options::get_or(&ctx.db, CUSTOMER_EXPORTS_ENABLED, false).await? {
            info!(customer_id, list_id, "Customer exports are disabled, dropping export");
            return Ok(Outcome::Ack);
        }

        if customer::Entity::find_by_id(customer_id)
            .one(&ctx.db)
            .await?
            .is_none()
        {
            info!(customer_id, "Customer no longer exists, dropping export");
            return Ok(Outcome::Ack);
        }
        let owned = list::Entity::find_by_id(list_id)
            .one(&ctx.db)
            .await?
            .is_some_and(|l| l.customer_id == customer_id);
        if !owned {
            info!(customer_id, list_id, "List is gone or not owned by the customer, dropping export");
            return Ok(Outcome::Ack);
        }

        let mut search = SubscriberSearch::from_payload(&message.payload);
        search.list_id = Some(list_id);
        let batch_size = options::get_or(&ctx.db, EXPORTER_PROCESS_AT_ONCE, 500u64).await?;
        let file_name = format!(
            "list-{list_id}-subscribers-{}.csv",
            uuid::Uuid::now_v7().simple()
        );

        let stats = export_subscribers(ctx, scope, &search, batch_size, &file_name).await?;

        let count = stats.rows.to_string();
        let url = download_url(&file_name);
        let (title, body) = EXPORT_READY.render(&[("count", count.as_str()), ("url", url.as_str())]);
        notify::notify_customer(&ctx.db, customer_id, title, body).await?;
        schedule_cleanup(ctx, &file_name).await?;

        info!(customer_id, list_id, file_name = %file_name, rows = stats.rows, "Customer list export finished");
        Ok(Outcome::Ack)
    }
}
