use std::path::Path;

use anyhow::Context;
use common::AppVersion;
use common::storage::QueueStorage;
use sea_orm::{ConnectionTrait, DatabaseTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::sql::SqlLoader;
use super::translations;
use crate::options;

/// Everything an update worker may touch. Database access goes through the
/// transaction that also records the version marker.
pub struct UpdateContext<'a> {
    conn: &'a DatabaseTransaction,
    version: AppVersion,
    sql: &'a SqlLoader,
    translations_dir: &'a Path,
    storage: &'a dyn QueueStorage,
    notices: Vec<String>,
}

impl<'a> UpdateContext<'a> {
    pub(crate) fn new(
        conn: &'a DatabaseTransaction,
        version: AppVersion,
        sql: &'a SqlLoader,
        translations_dir: &'a Path,
        storage: &'a dyn QueueStorage,
    ) -> Self {
        Self {
            conn,
            version,
            sql,
            translations_dir,
            storage,
            notices: Vec::new(),
        }
    }

    pub fn conn(&self) -> &DatabaseTransaction {
        self.conn
    }

    /// Version the running worker brings the database to.
    pub fn version(&self) -> &AppVersion {
        &self.version
    }

    pub fn storage(&self) -> &dyn QueueStorage {
        self.storage
    }

    /// Execute every statement of this version's SQL file, in order.
    pub async fn run_queries_from_sql_file(&self) -> anyhow::Result<usize> {
        let statements = self.sql.load(&self.version).await?;
        for (index, statement) in statements.iter().enumerate() {
            debug!(version = %self.version, index, "Executing update statement");
            self.conn
                .execute_unprepared(statement)
                .await
                .with_context(|| {
                    format!(
                        "Statement {} of {} failed: {}",
                        index + 1,
                        self.sql.path(&self.version).display(),
                        statement
                    )
                })?;
        }
        Ok(statements.len())
    }

    pub async fn get_option<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        Ok(options::get(self.conn, key).await?)
    }

    pub async fn set_option<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        options::set(self.conn, key, value).await?;
        Ok(())
    }

    /// Import `<translations_dir>/<version>.json`.
    pub async fn import_translations(&self) -> anyhow::Result<usize> {
        let path = self.translations_dir.join(format!("{}.json", self.version));
        let inserted = translations::import_file(self.conn, &path).await?;
        info!(version = %self.version, inserted, "Imported translation sources");
        Ok(inserted)
    }

    /// Leave a message for the operator running the update.
    pub fn notice(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(version = %self.version, notice = %message, "Update notice");
        self.notices.push(message);
    }

    pub(crate) fn into_notices(self) -> Vec<String> {
        self.notices
    }
}
