use async_trait::async_trait;
use common::hook::HookScope;
use common::payload::payload_i64;
use common::topic::BACKEND_SUBSCRIBERS_EXPORT;
use mq::{Outcome, Processor, QueueMessage};
use sea_orm::EntityTrait;
use server::entity::user;
use server::filters::SubscriberSearch;
use server::notify::{self, EXPORT_READY};
use server::options::{self, EXPORTER_PROCESS_AT_ONCE};
use tracing::{info, instrument};

use crate::context::WorkerContext;
use crate::export::{download_url, export_subscribers, schedule_cleanup};

/// Exports every subscriber matching a backend search for a backend user.
pub struct SubscribersExport;

#[async_trait]
impl Processor<WorkerContext> for SubscribersExport {
    fn topic(&self) -> &'static str {
        BACKEND_SUBSCRIBERS_EXPORT
    }

    #[instrument(skip_all, fields(id = message.id))]
    async fn process(
        &self,
        ctx: &WorkerContext,
        message: &QueueMessage,
        scope: &HookScope,
    ) -> anyhow::Result<Outcome> {
        let Some(user_id) = payload_i64(&message.payload, "user_id")
            .and_then(|id| i32::try_from(id).ok())
        else {
            return Ok(Outcome::Reject("Payload has no valid user_id".into()));
        };

        if user::Entity::find_by_id(user_id).one(&ctx.db).await?.is_none() {
            info!(user_id, "Requesting user no longer exists, dropping export");
            return Ok(Outcome::Ack);
        }

        let search = SubscriberSearch::from_payload(&message.payload);
        let batch_size = options::get_or(&ctx.db, EXPORTER_PROCESS_AT_ONCE, 500u64).await?;
        let file_name = format!("subscribers-export-{}.csv", uuid::Uuid::now_v7().simple());

        let stats = export_subscribers(ctx, scope, &search, batch_size, &file_name).await?;

        let count = stats.rows.to_string();
        let url = download_url(&file_name);
        let (title, body) = EXPORT_READY.render(&[("count", count.as_str()), ("url", url.as_str())]);
        notify::notify_user(&ctx.db, user_id, title, body).await?;
        schedule_cleanup(ctx, &file_name).await?;

        info!(user_id, file_name = %file_name, rows = stats.rows, "Subscribers export finished");
        Ok(Outcome::Ack)
    }
}
