//! Camera device registry endpoints

use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{CameraState, DeviceDescriptor},
};

/// Devices the presentation layer discovered on its platform
#[derive(Deserialize, ToSchema)]
pub struct RegisterDevicesRequest {
    pub devices: Vec<DeviceDescriptor>,
    /// Whether the platform granted camera access
    pub permission_granted: bool,
}

/// Device selection request
#[derive(Deserialize, ToSchema)]
pub struct SelectDeviceRequest {
    pub device_id: String,
}

/// Current camera registry state
#[utoipa::path(
    get,
    path = "/camera",
    tag = "camera",
    responses(
        (status = 200, description = "Camera registry state", body = CameraState)
    )
)]
pub async fn get_camera_state(
    State(state): State<crate::AppState>,
) -> AppResult<Json<CameraState>> {
    Ok(Json(state.services.camera.state()?))
}

/// Register discovered devices, restoring the persisted preference
#[utoipa::path(
    post,
    path = "/camera/devices",
    tag = "camera",
    request_body = RegisterDevicesRequest,
    responses(
        (status = 200, description = "Registry updated", body = CameraState)
    )
)]
pub async fn register_devices(
    State(state): State<crate::AppState>,
    Json(request): Json<RegisterDevicesRequest>,
) -> AppResult<Json<CameraState>> {
    let camera = state
        .services
        .camera
        .register_devices(request.devices, request.permission_granted)?;
    Ok(Json(camera))
}

/// Select the active device and persist the preference
#[utoipa::path(
    put,
    path = "/camera/selected",
    tag = "camera",
    request_body = SelectDeviceRequest,
    responses(
        (status = 200, description = "Device selected", body = CameraState),
        (status = 404, description = "Unknown device id")
    )
)]
pub async fn select_device(
    State(state): State<crate::AppState>,
    Json(request): Json<SelectDeviceRequest>,
) -> AppResult<Json<CameraState>> {
    let camera = state.services.camera.select_device(&request.device_id)?;
    Ok(Json(camera))
}
