use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use common::AppVersion;
use common::hook::HookRegistry;
use common::storage::FilesystemQueueStorage;
use mq::Mq;
use server::config::AppConfig;
use server::filters::MemorySessionStore;
use server::state::AppState;
use server::updater::{UpdateRegistry, Updater};
use tracing::{Level, error, info};

#[derive(Parser)]
#[command(name = "server", version, about = "Email marketing backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the admin API (default).
    Serve,
    /// Run pending updates and print the report.
    Update {
        /// Stop at this version instead of the code version.
        #[arg(long)]
        to: Option<AppVersion>,
    },
    /// Print installed and code versions and the pending updates.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load config")?;
    let state = build_state(config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(state).await,
        Command::Update { to } => {
            let target = to.unwrap_or_else(|| state.updater.code_version().clone());
            match state.updater.run_to(&target).await {
                Ok(report) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    Ok(())
                }
                Err(e) => {
                    error!(error = %e, "Update failed");
                    Err(e.into())
                }
            }
        }
        Command::Status => {
            let status = state.updater.status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
    }
}

async fn build_state(config: AppConfig) -> anyhow::Result<AppState> {
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
    let hooks = Arc::new(HookRegistry::new());

    let updater = Updater::new(
        db.clone(),
        UpdateRegistry::bundled()?,
        &config.update.sql_dir,
        &config.update.translations_dir,
        storage.clone(),
        hooks.clone(),
    );

    Ok(AppState {
        db,
        mq,
        storage,
        sessions: Arc::new(MemorySessionStore::new()),
        hooks,
        updater: Arc::new(updater),
        config: Arc::new(config),
    })
}

async fn serve(state: AppState) -> anyhow::Result<()> {
    if state.config.update.auto_run {
        let report = state.updater.run().await?;
        info!(from = %report.from, to = %report.to, "Pending updates applied");
    } else {
        let status = state.updater.status().await?;
        if !status.pending.is_empty() {
            info!(
                db_version = %status.db_version,
                pending = status.pending.len(),
                "Updates are pending; run `server update`"
            );
        }
    }

    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse()
        .context("Invalid server address")?;
    let app = server::build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
