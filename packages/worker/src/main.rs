use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use common::hook::HookRegistry;
use common::storage::FilesystemQueueStorage;
use mq::{ConsumeConfig, Consumer, Mq};
use tracing::{error, info};
use worker::{WorkerAppConfig, WorkerContext, dispatcher, schedule_count_history};

#[derive(Parser)]
#[command(name = "worker", version, about = "Background queue worker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Consume messages until interrupted (default).
    Run,
    /// Process every visible message once, print a summary and exit.
    Drain,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    let config = WorkerAppConfig::load().context("Failed to load config")?;
    info!("Worker starting: {}", config.worker.id);

    let db = server::database::init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    let mq = Mq::new(db.clone(), Duration::from_secs(config.queue.lease_secs));
    mq.install().await.context("Failed to install queue table")?;

    let storage = Arc::new(
        FilesystemQueueStorage::new(PathBuf::from(&config.storage.path), config.storage.max_size)
            .await
            .context("Failed to open queue storage")?,
    );
    let ctx = WorkerContext {
        db,
        mq: mq.clone(),
        storage,
        hooks: Arc::new(HookRegistry::new()),
    };

    let consumer = Consumer::new(mq, dispatcher()?, ConsumeConfig::from(&config.queue));
    info!(topics = ?consumer.dispatcher().topics(), "Processors registered");

    match cli.command.unwrap_or(Command::Run) {
        Command::Drain => {
            schedule_count_history(&ctx).await?;
            let summary = consumer.drain(&ctx).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Run => {
            let interval = Duration::from_secs(config.worker.schedule_interval_secs.max(1));
            let scheduler_ctx = ctx.clone();
            let scheduler = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    ticker.tick().await;
                    if let Err(e) = schedule_count_history(&scheduler_ctx).await {
                        error!(error = %e, "Failed to schedule count history");
                    }
                }
            });

            let summary = consumer
                .run(&ctx, async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!(error = %e, "Failed to listen for shutdown signal");
                    }
                })
                .await;
            scheduler.abort();

            info!(
                acked = summary.acked,
                rejected = summary.rejected,
                failed = summary.failed,
                dead_lettered = summary.dead_lettered,
                "Worker stopped"
            );
        }
    }

    Ok(())
}
