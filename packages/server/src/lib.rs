pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod filters;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod options;
pub mod routes;
pub mod state;
pub mod updater;


use crate::state::AppState;

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .nest("/api", routes::api_routes())
        .with_state(state)
}
