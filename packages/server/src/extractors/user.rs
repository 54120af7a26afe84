use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

pub const USER_HEADER: &str = "X-User-Id";

/// Backend user on whose behalf the request is made, as asserted by the
/// fronting application in the `X-User-Id` header.
#[derive(Debug, Clone, Copy)]
pub struct ActingUser {
    pub user_id: i32,
}

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let user_id = raw
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| AppError::Validation(format!("Invalid {USER_HEADER} header")))?;

        Ok(ActingUser { user_id })
    }
}
