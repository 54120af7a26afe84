//! Versioned schema and data updates.
//!
//! The installed version lives in the options table. An update pass runs
//! every registered worker newer than that version, in ascending order, each
//! in its own transaction together with the new version marker. A failing
//! worker rolls back and stops the pass, so the database always sits at the
//! last version that completed. Each worker transaction first locks and
//! re-reads the marker, so concurrent passes from other processes skip
//! workers that were already applied.

mod context;
mod registry;
pub mod sql;
pub mod translations;
pub mod workers;

use std::path::PathBuf;
use std::sync::Arc;

use common::AppVersion;
use common::event::Event;
use common::hook::{HookRegistry, HookScope};
use common::storage::QueueStorage;
use common::topic::{
    HOOK_UPDATE_WORKER_APPLIED, HOOK_UPDATE_WORKER_FAILED, HOOK_UPDATE_WORKER_STARTED,
};
use sea_orm::{DatabaseConnection, DbErr, TransactionTrait};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::options::{self, OptionError, VERSION_KEY};

pub use context::UpdateContext;
pub use registry::{UpdateRegistry, UpdateWorker};
pub use sql::{SqlDialect, SqlLoader};

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error(transparent)]
    Option(#[from] OptionError),

    #[error("Update workers out of order: {previous} is followed by {next}")]
    Unordered {
        previous: AppVersion,
        next: AppVersion,
    },

    #[error("Update to {version} failed, database remains at {last_applied}: {source:#}")]
    WorkerFailed {
        version: AppVersion,
        last_applied: AppVersion,
        #[source]
        source: anyhow::Error,
    },
}

/// Version of the running code.
pub fn code_version() -> AppVersion {
    AppVersion::parse(env!("CARGO_PKG_VERSION")).unwrap_or(AppVersion::ZERO)
}

/// Lifecycle events published on the hook registry during a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UpdateEvent {
    Started { version: AppVersion },
    Applied { version: AppVersion },
    Failed { version: AppVersion, error: String },
}

impl Event for UpdateEvent {
    fn topic(&self) -> &str {
        match self {
            Self::Started { .. } => HOOK_UPDATE_WORKER_STARTED,
            Self::Applied { .. } => HOOK_UPDATE_WORKER_APPLIED,
            Self::Failed { .. } => HOOK_UPDATE_WORKER_FAILED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateStatus {
    pub db_version: AppVersion,
    pub code_version: AppVersion,
    pub pending: Vec<AppVersion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub from: AppVersion,
    pub to: AppVersion,
    pub applied: Vec<AppVersion>,
    pub notices: Vec<String>,
}

pub struct Updater {
    db: DatabaseConnection,
    registry: UpdateRegistry,
    sql: SqlLoader,
    translations_dir: PathBuf,
    storage: Arc<dyn QueueStorage>,
    hooks: Arc<HookRegistry>,
    code_version: AppVersion,
    /// Serializes passes started from this process.
    running: Mutex<()>,
}

impl Updater {
    pub fn new(
        db: DatabaseConnection,
        registry: UpdateRegistry,
        sql_dir: impl Into<PathBuf>,
        translations_dir: impl Into<PathBuf>,
        storage: Arc<dyn QueueStorage>,
        hooks: Arc<HookRegistry>,
    ) -> Self {
        let dialect = SqlDialect::from(db.get_database_backend());
        Self {
            db,
            registry,
            sql: SqlLoader::new(sql_dir, dialect),
            translations_dir: translations_dir.into(),
            storage,
            hooks,
            code_version: code_version(),
            running: Mutex::new(()),
        }
    }

    /// Override the version `run` updates to.
    pub fn with_code_version(mut self, version: AppVersion) -> Self {
        self.code_version = version;
        self
    }

    pub fn code_version(&self) -> &AppVersion {
        &self.code_version
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Installed version; `0.0.0` when none was ever recorded.
    pub async fn db_version(&self) -> Result<AppVersion, UpdateError> {
        options::install(&self.db).await?;
        Ok(options::get(&self.db, VERSION_KEY)
            .await?
            .unwrap_or(AppVersion::ZERO))
    }

    pub async fn status(&self) -> Result<UpdateStatus, UpdateError> {
        let db_version = self.db_version().await?;
        let pending = self
            .registry
            .pending(&db_version, &self.code_version)
            .iter()
            .map(|w| w.version())
            .collect();

        Ok(UpdateStatus {
            db_version,
            code_version: self.code_version.clone(),
            pending,
        })
    }

    /// Update to the code version.
    pub async fn run(&self) -> Result<UpdateReport, UpdateError> {
        let target = self.code_version.clone();
        self.run_to(&target).await
    }

    /// Run every pending worker up to and including `target`, then raise the
    /// recorded version to `target` if no worker did.
    pub async fn run_to(&self, target: &AppVersion) -> Result<UpdateReport, UpdateError> {
        let _running = self.running.lock().await;

        let from = self.db_version().await?;
        let scope = HookScope::new();
        let mut current = from.clone();
        let mut applied = Vec::new();
        let mut notices = Vec::new();

        info!(from = %from, target = %target, "Starting update pass");

        // Every pass locks this row before running a worker.
        options::set_if_missing(&self.db, VERSION_KEY, &AppVersion::ZERO).await?;

        for worker in self.registry.pending(&from, target) {
            let version = worker.version();

            let txn = self.db.begin().await?;
            let installed = options::get_for_update(&txn, VERSION_KEY)
                .await?
                .unwrap_or(AppVersion::ZERO);
            if installed >= version {
                txn.rollback().await?;
                info!(version = %version, installed = %installed, "Update worker already applied elsewhere");
                if installed > current {
                    current = installed;
                }
                continue;
            }

            self.emit(&scope, UpdateEvent::Started {
                version: version.clone(),
            })
            .await;
            info!(version = %version, "Running update worker");

            let mut ctx = UpdateContext::new(
                &txn,
                version.clone(),
                &self.sql,
                &self.translations_dir,
                self.storage.as_ref(),
            );
            let outcome = match worker.run(&mut ctx).await {
                Ok(()) => options::set(&txn, VERSION_KEY, &version)
                    .await
                    .map_err(anyhow::Error::from),
                Err(e) => Err(e),
            };
            let worker_notices = ctx.into_notices();

            let outcome = match outcome {
                Ok(()) => txn.commit().await.map_err(anyhow::Error::from),
                Err(e) => {
                    if let Err(rollback) = txn.rollback().await {
                        warn!(version = %version, error = %rollback, "Rollback failed");
                    }
                    Err(e)
                }
            };

            if let Err(source) = outcome {
                error!(
                    version = %version,
                    last_applied = %current,
                    error = %format!("{source:#}"),
                    "Update worker failed"
                );
                self.emit(&scope, UpdateEvent::Failed {
                    version: version.clone(),
                    error: format!("{source:#}"),
                })
                .await;
                return Err(UpdateError::WorkerFailed {
                    version,
                    last_applied: current,
                    source,
                });
            }

            notices.extend(worker_notices);
            applied.push(version.clone());
            current = version.clone();
            info!(version = %version, "Update worker applied");
            self.emit(&scope, UpdateEvent::Applied { version }).await;
        }

        current = self.raise_version(target).await?.max(current);

        info!(from = %from, to = %current, applied = applied.len(), "Update pass finished");
        Ok(UpdateReport {
            from,
            to: current,
            applied,
            notices,
        })
    }

    /// Raise the marker to `version` unless another pass already moved it
    /// there or beyond. Returns the marker afterwards.
    async fn raise_version(&self, version: &AppVersion) -> Result<AppVersion, UpdateError> {
        let txn = self.db.begin().await?;
        let installed = options::get_for_update(&txn, VERSION_KEY)
            .await?
            .unwrap_or(AppVersion::ZERO);
        if installed >= *version {
            txn.rollback().await?;
            return Ok(installed);
        }
        options::set(&txn, VERSION_KEY, version).await?;
        txn.commit().await?;
        Ok(version.clone())
    }

    async fn emit(&self, scope: &HookScope, event: UpdateEvent) {
        if let Err(e) = self.hooks.trigger(scope, &event).await {
            warn!(topic = event.topic(), error = %e, "Update hook failed");
        }
    }
}
