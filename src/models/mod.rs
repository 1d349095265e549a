//! Data models

pub mod camera;
pub mod item;
pub mod session;

pub use camera::{CameraState, DeviceDescriptor};
pub use item::{Page, ResolvedItem};
pub use session::{
    BatchResult, EngineSnapshot, InventoryEntry, InventoryReport, InventorySession, LoanSession,
    Mode, ModeState,
};
