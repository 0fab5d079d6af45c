//! HTTP server implementation using Axum.

use axum::{
    Router,
    routing::{get, post},
};
use shiftminus_core::config::GatewayConfig;
use shiftminus_scheduler::{Desk, Services};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for the gateway server.
pub struct AppState {
    pub gateway_config: GatewayConfig,
    pub services: Services,
    pub desk: Desk,
    /// Forwarded to the spawned job so it reads the same file.
    pub config_path: Option<PathBuf>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(services: Services, config_path: Option<PathBuf>) -> Self {
        Self {
            gateway_config: services.config.gateway.clone(),
            desk: Desk::new(services.clone()),
            services,
            config_path,
            start_time: std::time::Instant::now(),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let shared = Arc::new(state);

    let api = Router::new()
        .route(
            "/api/v1/shortfalls",
            get(super::routes::list_shortfalls).post(super::routes::add_shortfall),
        )
        .route("/api/v1/shortfalls/{id}/fill", post(super::routes::fill_shortfall))
        .route(
            "/api/v1/departments/{department}/notify",
            post(super::routes::send_notice),
        )
        .route(
            "/api/v1/deadline",
            get(super::routes::get_deadline).put(super::routes::set_deadline),
        )
        .route("/api/v1/deadline/announce", post(super::routes::announce_deadline));

    // The external cron service polls these two without credentials.
    let public = Router::new()
        .route("/health", get(super::routes::health_check))
        .route("/run_notify", get(super::routes::run_notify));

    let cors = CorsLayer::new()
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_origin(Any)
        .max_age(std::time::Duration::from_secs(3600));

    api.merge(public)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(shared)
}

/// Start the HTTP server and serve until the process is stopped.
pub async fn start(services: Services, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = services.config.gateway.clone();
    let app = build_router(AppState::new(services, config_path));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 Gateway server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
