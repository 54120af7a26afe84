//! Persisted key/value options shared by every process.
//!
//! Values are stored as JSON so that flags, counters and versions share one
//! table. Writes are last-write-wins.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DbBackend, DbErr, EntityTrait, QuerySelect, Schema, Set};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::entity::app_option::{self, Column, Entity};

/// Version of the schema/data currently installed.
pub const VERSION_KEY: &str = "system.common.version";
/// Subscribers fetched per export batch.
pub const EXPORTER_PROCESS_AT_ONCE: &str = "system.exporter.process_at_once";
pub const COUNT_HISTORY_ENABLED: &str = "system.cron.subscriber_count_history.enabled";
pub const CUSTOMER_EXPORTS_ENABLED: &str = "system.customer.exports.enabled";

#[derive(Debug, Error)]
pub enum OptionError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Option '{key}' holds an unexpected value: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Option '{key}' cannot be encoded: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Create the options table if it does not exist.
pub async fn install<C: ConnectionTrait>(conn: &C) -> Result<(), DbErr> {
    let backend = conn.get_database_backend();
    let mut table = Schema::new(backend).create_table_from_entity(Entity);
    table.if_not_exists();
    conn.execute_raw(backend.build(&table)).await?;
    Ok(())
}

pub async fn get<T, C>(conn: &C, key: &str) -> Result<Option<T>, OptionError>
where
    T: DeserializeOwned,
    C: ConnectionTrait,
{
    let Some(row) = Entity::find_by_id(key.to_string()).one(conn).await? else {
        return Ok(None);
    };

    serde_json::from_str(&row.value)
        .map(Some)
        .map_err(|source| OptionError::Decode {
            key: key.to_string(),
            source,
        })
}

/// Read an option inside a transaction, holding a row lock on it until the
/// transaction ends. SQLite has no row locks; its write lock serializes the
/// transaction at its first write instead.
pub async fn get_for_update<T, C>(conn: &C, key: &str) -> Result<Option<T>, OptionError>
where
    T: DeserializeOwned,
    C: ConnectionTrait,
{
    let mut query = Entity::find_by_id(key.to_string());
    if conn.get_database_backend() != DbBackend::Sqlite {
        query = query.lock_exclusive();
    }
    let Some(row) = query.one(conn).await? else {
        return Ok(None);
    };

    serde_json::from_str(&row.value)
        .map(Some)
        .map_err(|source| OptionError::Decode {
            key: key.to_string(),
            source,
        })
}

/// Store `value` unless the option already exists. Returns `true` if it was
/// inserted.
pub async fn set_if_missing<T, C>(conn: &C, key: &str, value: &T) -> Result<bool, OptionError>
where
    T: Serialize + ?Sized,
    C: ConnectionTrait,
{
    let value = serde_json::to_string(value).map_err(|source| OptionError::Encode {
        key: key.to_string(),
        source,
    })?;

    let inserted = Entity::insert(app_option::ActiveModel {
        option_key: Set(key.to_string()),
        value: Set(value),
        updated_at: Set(Utc::now()),
    })
    .on_conflict(OnConflict::column(Column::OptionKey).do_nothing().to_owned())
    .exec_without_returning(conn)
    .await?;

    Ok(inserted > 0)
}

pub async fn get_or<T, C>(conn: &C, key: &str, default: T) -> Result<T, OptionError>
where
    T: DeserializeOwned,
    C: ConnectionTrait,
{
    Ok(get(conn, key).await?.unwrap_or(default))
}

pub async fn set<T, C>(conn: &C, key: &str, value: &T) -> Result<(), OptionError>
where
    T: Serialize + ?Sized,
    C: ConnectionTrait,
{
    let value = serde_json::to_string(value).map_err(|source| OptionError::Encode {
        key: key.to_string(),
        source,
    })?;

    let model = app_option::ActiveModel {
        option_key: Set(key.to_string()),
        value: Set(value),
        updated_at: Set(Utc::now()),
    };

    Entity::insert(model)
        .on_conflict(
            OnConflict::column(Column::OptionKey)
                .update_columns([Column::Value, Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    Ok(())
}
