//! Caller identity extractor.
//!
//! Sessions are handled by the fronting proxy, which forwards the
//! authenticated user's id in the `x-user-id` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use trackreel_core::types::UserId;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The user a request acts for.
///
/// ```ignore
/// async fn my_handler(user: UserIdentity) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct UserIdentity {
    pub user_id: UserId,
}

impl<S> FromRequestParts<S> for UserIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized(format!("Missing {USER_ID_HEADER} header")))?;

        let user_id = raw.trim().parse().map_err(|_| {
            AppError::Unauthorized(format!("Invalid {USER_ID_HEADER} header: {raw}"))
        })?;

        Ok(UserIdentity { user_id })
    }
}
