use std::sync::Arc;

use trackreel_worker::RenderCoordinator;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Render job coordinator. Owns the option registry and activity source.
    pub coordinator: Arc<RenderCoordinator>,
}
