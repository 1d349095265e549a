//! Camera device registry
//!
//! Tracks which decode devices the presentation layer has discovered and
//! which one the operator prefers. The preference is the only scanner
//! state that survives a restart, stored as a small key/value JSON file.
//! Switching devices is a full scan-source restart on the presentation
//! side; this service only tracks the selection.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{CameraState, DeviceDescriptor},
};

const PREFERRED_CAMERA_KEY: &str = "preferred-camera";

#[derive(Debug)]
pub struct CameraService {
    preferences_file: PathBuf,
    state: Mutex<CameraState>,
}

impl CameraService {
    pub fn new(preferences_file: impl Into<PathBuf>) -> Self {
        Self {
            preferences_file: preferences_file.into(),
            state: Mutex::new(CameraState::default()),
        }
    }

    /// Register the devices the presentation layer discovered, restoring
    /// the persisted preference or falling back to the first device.
    pub fn register_devices(
        &self,
        devices: Vec<DeviceDescriptor>,
        permission_granted: bool,
    ) -> AppResult<CameraState> {
        let preferred = self.load_preference();

        let mut state = self
            .state
            .lock()
            .map_err(|_| AppError::Internal("Camera state lock poisoned".to_string()))?;

        state.permission_granted = permission_granted;
        state.available = permission_granted && !devices.is_empty();
        state.selected = if state.available {
            preferred
                .and_then(|id| devices.iter().find(|d| d.id == id).cloned())
                .or_else(|| devices.first().cloned())
        } else {
            None
        };
        state.devices = devices;

        if !state.available {
            tracing::info!("No usable camera; manual code entry remains fully functional");
        }
        Ok(state.clone())
    }

    /// Select a device and persist the preference
    pub fn select_device(&self, device_id: &str) -> AppResult<CameraState> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AppError::Internal("Camera state lock poisoned".to_string()))?;

        let device = state
            .devices
            .iter()
            .find(|d| d.id == device_id)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!("No camera device with id '{}'", device_id))
            })?;

        self.store_preference(&device.id)?;
        tracing::info!(
            "Selected camera '{}'",
            device.label.as_deref().unwrap_or(&device.id)
        );
        state.selected = Some(device);
        Ok(state.clone())
    }

    pub fn state(&self) -> AppResult<CameraState> {
        let state = self
            .state
            .lock()
            .map_err(|_| AppError::Internal("Camera state lock poisoned".to_string()))?;
        Ok(state.clone())
    }

    fn load_preference(&self) -> Option<String> {
        let raw = std::fs::read_to_string(&self.preferences_file).ok()?;
        let prefs: HashMap<String, String> = serde_json::from_str(&raw).ok()?;
        prefs.get(PREFERRED_CAMERA_KEY).cloned()
    }

    fn store_preference(&self, device_id: &str) -> AppResult<()> {
        let mut prefs: HashMap<String, String> = std::fs::read_to_string(&self.preferences_file)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        prefs.insert(PREFERRED_CAMERA_KEY.to_string(), device_id.to_string());

        let json = serde_json::to_string_pretty(&prefs)
            .map_err(|e| AppError::Internal(format!("Failed to serialize preferences: {}", e)))?;
        std::fs::write(&self.preferences_file, json)
            .map_err(|e| AppError::Internal(format!("Failed to write preferences: {}", e)))
    }
}
