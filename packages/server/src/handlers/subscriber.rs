use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;
use common::Payload;
use sea_orm::{PaginatorTrait, QuerySelect};
use tracing::instrument;

use crate::error::AppError;
use crate::extractors::session::ensure_session;
use crate::filters::{StickyFilter, SubscriberSearch};
use crate::models::shared::{PageParams, Pagination};
use crate::models::subscriber::{SubscriberListResponse, SubscriberResponse};
use crate::state::AppState;

pub const SUBSCRIBER_FILTER: &str = "list_subscribers";

/// Query string pairs as a payload; the last occurrence of a key wins.
pub(crate) fn query_payload(pairs: &[(String, String)]) -> Payload {
    pairs
        .iter()
        .map(|(k, v)| (k.clone(), v.as_str().into()))
        .collect()
}

fn page_params(pairs: &[(String, String)]) -> Result<PageParams, AppError> {
    let parse = |key: &str| {
        pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| {
                v.parse::<u64>()
                    .map_err(|_| AppError::Validation(format!("Invalid {key}")))
            })
            .transpose()
    };
    Ok(PageParams {
        page: parse("page")?,
        per_page: parse("per_page")?,
    })
}

/// Resolve the session's sticky subscriber filter, merged with `submitted`.
pub(crate) fn sticky_search(
    state: &AppState,
    session_id: &str,
    submitted: &Payload,
) -> SubscriberSearch {
    let filter = StickyFilter::new(
        state.sessions.as_ref(),
        &state.config.server.app_name,
        SUBSCRIBER_FILTER,
    );
    let mut search = SubscriberSearch::default();
    filter.apply(session_id, &mut search, submitted);
    search
}

/// Forget the filter values remembered for the session.
#[instrument(skip(state, jar))]
pub async fn clear_subscriber_filter(
    State(state): State<AppState>,
    jar: CookieJar,
) -> StatusCode {
    if let Some(cookie) = jar.get(&state.config.server.session_cookie) {
        StickyFilter::new(
            state.sessions.as_ref(),
            &state.config.server.app_name,
            SUBSCRIBER_FILTER,
        )
        .reset(cookie.value());
    }
    StatusCode::NO_CONTENT
}

/// Search subscribers. Filter values are remembered for the session.
#[instrument(skip(state, jar, query))]
pub async fn list_subscribers(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<(CookieJar, Json<SubscriberListResponse>), AppError> {
    let (page, per_page) = page_params(&query)?.resolve();
    let (jar, session_id) = ensure_session(jar, &state.config.server.session_cookie);

    let search = sticky_search(&state, &session_id, &query_payload(&query));

    let select = search.query();
    let total = select.clone().count(&state.db).await?;
    let rows = select
        .offset(PageParams::offset(page, per_page))
        .limit(per_page)
        .all(&state.db)
        .await?;

    Ok((
        jar,
        Json(SubscriberListResponse {
            filter: search,
            data: rows.into_iter().map(SubscriberResponse::from).collect(),
            pagination: Pagination::new(page, per_page, total),
        }),
    ))
}
