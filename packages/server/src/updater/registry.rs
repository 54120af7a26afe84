use std::sync::Arc;

use async_trait::async_trait;
use common::AppVersion;

use super::UpdateError;
use super::context::UpdateContext;

/// Migration logic that brings the database to one application version.
///
/// Workers are not safe to run twice; the [`Updater`](super::Updater) runs
/// each at most once per database.
#[async_trait]
pub trait UpdateWorker: Send + Sync {
    fn version(&self) -> AppVersion;

    async fn run(&self, ctx: &mut UpdateContext<'_>) -> anyhow::Result<()>;
}

/// Update workers in strictly ascending version order.
#[derive(Clone)]
pub struct UpdateRegistry {
    workers: Vec<Arc<dyn UpdateWorker>>,
}

impl UpdateRegistry {
    /// Fails if two adjacent workers are not in strictly ascending order.
    pub fn new(workers: Vec<Arc<dyn UpdateWorker>>) -> Result<Self, UpdateError> {
        for pair in workers.windows(2) {
            let (previous, next) = (pair[0].version(), pair[1].version());
            if previous >= next {
                return Err(UpdateError::Unordered { previous, next });
            }
        }
        Ok(Self { workers })
    }

    pub fn versions(&self) -> Vec<AppVersion> {
        self.workers.iter().map(|w| w.version()).collect()
    }

    pub fn latest(&self) -> Option<AppVersion> {
        self.workers.last().map(|w| w.version())
    }

    /// Workers with `installed < version <= target`, ascending.
    pub fn pending(&self, installed: &AppVersion, target: &AppVersion) -> Vec<Arc<dyn UpdateWorker>> {
        self.workers
            .iter()
            .filter(|w| {
                let version = w.version();
                &version > installed && &version <= target
            })
            .cloned()
            .collect()
    }
}
