use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use common::topic::{BACKEND_SUBSCRIBERS_EXPORT, CUSTOMER_LIST_SUBSCRIBERS_EXPORT};
use common::{Headers, Payload};
use sea_orm::EntityTrait;
use tokio_util::io::ReaderStream;
use tracing::{info, instrument};

use crate::entity::{customer, list, user};
use crate::error::AppError;
use crate::extractors::session::ensure_session;
use crate::extractors::user::ActingUser;
use crate::filters::SubscriberSearch;
use crate::handlers::subscriber::{query_payload, sticky_search};
use crate::models::subscriber::ExportAccepted;
use crate::options::{self, CUSTOMER_EXPORTS_ENABLED};
use crate::state::AppState;

fn requested_by(user_id: i32) -> Headers {
    Headers::from([("requested_by".to_string(), user_id.to_string())])
}

/// Queue an export of every subscriber matching the session's filter.
#[instrument(skip(state, jar), fields(user_id = user.user_id))]
pub async fn export_subscribers(
    user: ActingUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar, Json<ExportAccepted>), AppError> {
    user::Entity::find_by_id(user.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    let (jar, session_id) = ensure_session(jar, &state.config.server.session_cookie);
    let search = sticky_search(&state, &session_id, &Payload::new());

    let mut payload = search.to_payload();
    payload.insert("user_id".into(), user.user_id.into());

    let message_id = state
        .mq
        .send(BACKEND_SUBSCRIBERS_EXPORT, &payload, &requested_by(user.user_id), 0)
        .await?;
    info!(message_id, "Subscribers export queued");

    Ok((
        StatusCode::ACCEPTED,
        jar,
        Json(ExportAccepted {
            message_id,
            topic: BACKEND_SUBSCRIBERS_EXPORT,
        }),
    ))
}

/// Queue an export of one customer list. Query parameters narrow the export
/// the same way they narrow a subscriber search.
#[instrument(skip(state, query), fields(user_id = user.user_id))]
pub async fn export_customer_list(
    user: ActingUser,
    State(state): State<AppState>,
    Path((customer_id, list_id)): Path<(i32, i32)>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<(StatusCode, Json<ExportAccepted>), AppError> {
    if !options::get_or(&state.db, CUSTOMER_EXPORTS_ENABLED, false).await? {
        return Err(AppError::Conflict("Customer exports are disabled".into()));
    }

    customer::Entity::find_by_id(customer_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Customer {customer_id} not found")))?;

    let owned = list::Entity::find_by_id(list_id)
        .one(&state.db)
        .await?
        .is_some_and(|l| l.customer_id == customer_id);
    if !owned {
        return Err(AppError::NotFound(format!(
            "List {list_id} not found for customer {customer_id}"
        )));
    }

    let mut search = SubscriberSearch::from_payload(&query_payload(&query));
    search.list_id = Some(list_id);

    let mut payload = search.to_payload();
    payload.insert("customer_id".into(), customer_id.into());

    let message_id = state
        .mq
        .send(
            CUSTOMER_LIST_SUBSCRIBERS_EXPORT,
            &payload,
            &requested_by(user.user_id),
            0,
        )
        .await?;
    info!(message_id, customer_id, list_id, "Customer list export queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(ExportAccepted {
            message_id,
            topic: CUSTOMER_LIST_SUBSCRIBERS_EXPORT,
        }),
    ))
}

/// Stream a finished export file.
#[instrument(skip(state))]
pub async fn download_export(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response, AppError> {
    let reader = state.storage.read_stream(&file_name).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response())
}
