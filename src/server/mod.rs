pub mod api;
pub mod dashboard;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::models::PriceTable;
use crate::services::PriceStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// Table cache for the dashboard, loaded once and kept until restart
    pub dashboard_cache: Arc<RwLock<Option<PriceTable>>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            dashboard_cache: Arc::new(RwLock::new(None)),
        }
    }

    pub fn store(&self) -> PriceStore {
        PriceStore::new(self.config.clone())
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Read-only API, safe to open up
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/", get(api::root_handler))
        .route("/prices", get(api::get_prices_handler))
        .route("/prices/latest", get(api::get_latest_price_handler))
        .route("/prices/date/{date}", get(api::get_price_by_date_handler))
        .route("/prices/range", get(api::get_prices_by_range_handler))
        .route("/stats", get(api::get_stats_handler))
        .route("/health", get(api::health_handler))
        .route("/dashboard", get(dashboard::dashboard_handler))
        .route("/dashboard/export.csv", get(dashboard::export_csv_handler))
        .layer(cors)
        .with_state(state)
}

/// Start the axum server
pub async fn serve(config: AppConfig, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting goldtrack server");
    tracing::info!("Registering routes:");
    tracing::info!("  GET /prices?limit=100&skip=0");
    tracing::info!("  GET /prices/latest");
    tracing::info!("  GET /prices/date/{{date}}");
    tracing::info!("  GET /prices/range?start_date=2024-01-01&end_date=2024-12-31");
    tracing::info!("  GET /stats");
    tracing::info!("  GET /health");
    tracing::info!("  GET /dashboard");

    let app = build_router(AppState::new(config));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
