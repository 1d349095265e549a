//! Business logic services

pub mod camera;
pub mod catalog;
pub mod circulation;
pub mod engine;
pub mod feedback;
pub mod resolver;
pub mod submitter;

use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub engine: engine::ScannerEngine,
    pub camera: Arc<camera::CameraService>,
}

impl Services {
    /// Wire the HTTP backend adapters and the scanner engine from config
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.backend.timeout_seconds))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let catalog: Arc<dyn catalog::CatalogClient> = Arc::new(catalog::HttpCatalogClient::new(
            http.clone(),
            config.backend.catalog_url.clone(),
        ));
        let circulation: Arc<dyn circulation::CirculationClient> = Arc::new(
            circulation::HttpCirculationClient::new(http, config.backend.circulation_url.clone()),
        );

        let resolver = resolver::CatalogResolver::new(
            catalog,
            config.scanner.search_page_size,
            config.scanner.id_upper_bound,
        );
        let submitter =
            submitter::BatchSubmitter::new(Arc::clone(&circulation), &config.scanner.export_dir);

        let engine = engine::ScannerEngine::new(
            resolver,
            circulation,
            submitter,
            Arc::new(feedback::TracingFeedback),
            &config.scanner,
        );
        let camera = Arc::new(camera::CameraService::new(&config.scanner.preferences_file));

        Ok(Self { engine, camera })
    }
}
