//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{camera, health, scanner};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BibScan API",
        version = "1.0.0",
        description = "Scan-driven circulation workflow REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        // Scanner
        scanner::get_state,
        scanner::events,
        scanner::scan,
        scanner::manual_entry,
        scanner::change_mode,
        scanner::reset_scan,
        scanner::finish_inventory,
        scanner::clear_inventory,
        scanner::complete_loan,
        scanner::reset_loan_subject,
        scanner::remove_loan_item,
        // Camera
        camera::get_camera_state,
        camera::register_devices,
        camera::select_device,
    ),
    components(
        schemas(
            // Scanner
            scanner::ScanRequest,
            scanner::ModeChangeRequest,
            scanner::ConfirmRequest,
            crate::services::engine::ScanOutcome,
            crate::services::engine::ScanReport,
            crate::services::engine::LoanCompletion,
            crate::services::engine::InventoryCompletion,
            crate::services::feedback::Feedback,
            crate::models::Mode,
            crate::models::ModeState,
            crate::models::EngineSnapshot,
            crate::models::InventoryEntry,
            crate::models::InventorySession,
            crate::models::InventoryReport,
            crate::models::LoanSession,
            crate::models::BatchResult,
            crate::models::ResolvedItem,
            // Camera
            camera::RegisterDevicesRequest,
            camera::SelectDeviceRequest,
            crate::models::CameraState,
            crate::models::DeviceDescriptor,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "scanner", description = "Scanner workflow"),
        (name = "camera", description = "Camera device registry")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
