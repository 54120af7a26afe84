use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use mq::MqError;
use sea_orm::DbErr;
use serde::Serialize;

use crate::options::OptionError;
use crate::updater::UpdateError;

/// Structured error response returned by all endpoints on failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`,
    /// `UNAUTHORIZED`, `NOT_FOUND`, `CONFLICT`, `UPDATE_FAILED`,
    /// `INTERNAL_ERROR`.
    pub code: &'static str,
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Unauthorized,
    NotFound(String),
    Conflict(String),
    /// An update worker failed; the database stays at the last applied version.
    UpdateFailed(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "UNAUTHORIZED",
                    message: "Missing acting user".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::UpdateFailed(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "UPDATE_FAILED",
                    message: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<MqError> for AppError {
    fn from(err: MqError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<OptionError> for AppError {
    fn from(err: OptionError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(name) => AppError::NotFound(format!("File '{name}' not found")),
            StorageError::InvalidName(e) => AppError::Validation(e.message().to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<UpdateError> for AppError {
    fn from(err: UpdateError) -> Self {
        match err {
            UpdateError::WorkerFailed { .. } => {
                tracing::warn!("Update failed: {err}");
                AppError::UpdateFailed(err.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}
