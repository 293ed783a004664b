use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::get,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use crate::config::PricepipeConfig;
use crate::service::PriceService;

pub mod routes;

/// Extra body allowance for multipart framing around the uploaded file
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Server state
pub struct AppState {
    pub service: PriceService,
}

/// Build the HTTP router
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = usize::try_from(state.service.max_upload_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/api/v0/prices",
            get(routes::get_prices).post(routes::post_prices),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(config: &PricepipeConfig) -> anyhow::Result<()> {
    crate::config::ensure_db_dir(&config.database_path())?;

    // Create the schema before accepting requests.
    let service = PriceService::from_config(config);
    service.open_store()?;

    let state = Arc::new(AppState { service });
    let app = router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Starting server on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
