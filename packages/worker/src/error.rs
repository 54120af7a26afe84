use common::storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("MQ error: {0}")]
    Mq(#[from] mq::MqError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Dispatch(#[from] mq::DispatchError),

    #[error(transparent)]
    Option(#[from] server::options::OptionError),
}

pub type Result<T> = std::result::Result<T, WorkerError>;
