use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trackreel_api::activity::JsonActivitySource;
use trackreel_api::config::ServerConfig;
use trackreel_api::router::build_app_router;
use trackreel_api::state::AppState;
use trackreel_core::registry::render_options;
use trackreel_worker::RenderCoordinator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "trackreel_api=debug,trackreel_worker=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        users_dir = %config.users_dir.display(),
        activities_dir = %config.activities_dir.display(),
        "Loaded server configuration",
    );

    // --- Render coordinator ---
    let registry = Arc::new(render_options());
    tracing::info!(options = registry.len(), "Render options registered");

    let source = Arc::new(JsonActivitySource::new(config.activities_dir.clone()));
    let coordinator = Arc::new(RenderCoordinator::new(
        config.coordinator_config(),
        registry,
        source,
    ));

    // --- App state ---
    let state = AppState {
        coordinator: Arc::clone(&coordinator),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    let in_flight = coordinator.in_flight();
    tracing::info!(in_flight, "Server stopped accepting connections, waiting for renders");
    coordinator.shutdown().await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl-C, starting graceful shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
