//! BibScan Circulation Scanner Service
//!
//! A Rust implementation of the scan-driven circulation workflow for
//! library front desks: a mode-based state machine that turns barcode/QR
//! decode events into catalog lookups, quick returns, inventory sessions
//! and batch loans against the library backend.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
