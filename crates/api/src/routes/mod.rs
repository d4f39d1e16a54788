pub mod health;
pub mod render;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /render                 submit a render job (POST, form-urlencoded)
/// /render/form            option form for the caller's activities
/// /render/status          state of the caller's latest job
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(render::router())
}
