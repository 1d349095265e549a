//! BibScan Server - Circulation Scanner Service
//!
//! REST backend for the scan-driven circulation workflow.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bibscan_server::{api, config::AppConfig, services::Services, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("bibscan_server={},tower_http=debug", config.logging.level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting BibScan Server v{}", env!("CARGO_PKG_VERSION"));

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Wire backend adapters and the scanner engine
    let services = Services::new(&config).expect("Failed to create services");

    tracing::info!(
        "Catalog backend: {}, circulation backend: {}",
        config.backend.catalog_url,
        config.backend.circulation_url
    );

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Scanner state
        .route("/scanner/state", get(api::scanner::get_state))
        .route("/scanner/events", get(api::scanner::events))
        // Scan input
        .route("/scanner/scan", post(api::scanner::scan))
        .route("/scanner/manual", post(api::scanner::manual_entry))
        // Mode and session control
        .route("/scanner/mode", put(api::scanner::change_mode))
        .route("/scanner/reset", post(api::scanner::reset_scan))
        .route("/scanner/inventory/finish", post(api::scanner::finish_inventory))
        .route("/scanner/inventory/clear", post(api::scanner::clear_inventory))
        .route("/scanner/loan/complete", post(api::scanner::complete_loan))
        .route("/scanner/loan/subject", delete(api::scanner::reset_loan_subject))
        .route("/scanner/loan/items/:id", delete(api::scanner::remove_loan_item))
        // Camera registry
        .route("/camera", get(api::camera::get_camera_state))
        .route("/camera/devices", post(api::camera::register_devices))
        .route("/camera/selected", put(api::camera::select_device))
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
