use comprova::config::{AppConfig, BackendKind};
use comprova::routes;
use comprova::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env();

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    tracing::info!("Starting comprova v{}", env!("CARGO_PKG_VERSION"));

    let state = AppState::new(config.clone());

    // Warm the backend handle so misconfiguration surfaces at startup
    // instead of on the first upload. Drive verifies its root folder here.
    match state.storage().await {
        Ok(storage) => tracing::info!(backend = storage.kind(), "Storage backend ready"),
        Err(e) => {
            tracing::error!("Storage backend initialization failed: {}", e);
            std::process::exit(1);
        }
    }
    if matches!(config.backend_kind(), Ok(BackendKind::Memory)) {
        tracing::warn!("Using the in-memory backend; stored objects do not survive a restart");
    }

    let app = routes::build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
