use axum::{Json, extract::State};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::state::AppState;
use crate::updater::{UpdateReport, UpdateStatus};

/// Installed and code versions, and the updates waiting to run.
#[instrument(skip(state))]
pub async fn get_update_status(
    State(state): State<AppState>,
) -> Result<Json<UpdateStatus>, AppError> {
    Ok(Json(state.updater.status().await?))
}

/// Run every pending update.
#[instrument(skip(state))]
pub async fn run_update(State(state): State<AppState>) -> Result<Json<UpdateReport>, AppError> {
    let report = state.updater.run().await?;
    info!(from = %report.from, to = %report.to, applied = report.applied.len(), "Update finished");
    Ok(Json(report))
}
