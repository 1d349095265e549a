//! Camera device types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One camera device as reported by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeviceDescriptor {
    /// Stable device identifier, used as the persisted preference key
    pub id: String,
    pub label: Option<String>,
}

/// Current camera availability and selection.
///
/// `available == false` is a first-class steady state: the scanner keeps
/// working through manual entry for as long as no camera exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CameraState {
    pub available: bool,
    pub permission_granted: bool,
    pub devices: Vec<DeviceDescriptor>,
    pub selected: Option<DeviceDescriptor>,
}
