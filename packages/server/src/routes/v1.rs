use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/update",
            get(handlers::update::get_update_status).post(handlers::update::run_update),
        )
        .nest("/subscribers", subscriber_routes())
        .route(
            "/customers/{customer_id}/lists/{list_id}/export",
            post(handlers::export::export_customer_list),
        )
        .route("/messages", get(handlers::message::list_messages))
        .route("/exports/{file_name}", get(handlers::export::download_export))
        .nest("/queue", queue_routes())
}

fn subscriber_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::subscriber::list_subscribers))
        .route("/export", post(handlers::export::export_subscribers))
        .route("/filter", delete(handlers::subscriber::clear_subscriber_filter))
}

fn queue_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/dead",
            get(handlers::queue::list_dead_letters).delete(handlers::queue::purge_dead_letters),
        )
        .route("/dead/{id}/retry", post(handlers::queue::retry_dead_letter))
}
