use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MqError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}
