use std::path::Path;

use anyhow::Context;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde::Deserialize;
use tracing::debug;

use crate::entity::translation_source::{self, Column, Entity};

/// One source string of a translation delta file.
#[derive(Debug, Deserialize)]
pub struct TranslationEntry {
    pub category: String,
    pub message: String,
}

/// Insert every entry of a JSON translation delta that is not already present.
/// Returns the number of rows inserted.
pub async fn import_file<C: ConnectionTrait>(conn: &C, path: &Path) -> anyhow::Result<usize> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Cannot read translation file {}", path.display()))?;
    let entries: Vec<TranslationEntry> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid translation file {}", path.display()))?;

    import_entries(conn, &entries).await
}

pub async fn import_entries<C: ConnectionTrait>(
    conn: &C,
    entries: &[TranslationEntry],
) -> anyhow::Result<usize> {
    let mut inserted = 0;
    for entry in entries {
        let exists = Entity::find()
            .filter(Column::Category.eq(entry.category.as_str()))
            .filter(Column::Message.eq(entry.message.as_str()))
            .count(conn)
            .await?
            > 0;
        if exists {
            debug!(category = %entry.category, "Translation source already present");
            continue;
        }

        Entity::insert(translation_source::ActiveModel {
            category: Set(entry.category.clone()),
            message: Set(entry.message.clone()),
            ..Default::default()
        })
        .exec_without_returning(conn)
        .await?;
        inserted += 1;
    }
    Ok(inserted)
}
