//! Configuration management for BibScan server

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Base URLs of the external collaborators
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub catalog_url: String,
    pub circulation_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScannerConfig {
    /// Codes parsing as a positive integer below this bound are treated as item IDs
    pub id_upper_bound: i64,
    /// Result page size requested from the catalog keyword search
    pub search_page_size: u32,
    /// SEARCH mode auto-resume cooldown after a failed lookup
    pub search_cooldown_seconds: u64,
    /// QUICK_RETURN display window before the scanned code is cleared
    pub return_display_seconds: u64,
    /// Directory receiving exported inventory reports
    pub export_dir: String,
    /// Key/value file holding the preferred camera device id
    pub preferences_file: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default"))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (with prefix BIBSCAN_)
            .add_source(
                Environment::with_prefix("BIBSCAN")
                    .separator("_")
                    .try_parsing(true),
            )
            // Override backend URLs from env vars if present
            .set_override_option(
                "backend.catalog_url",
                env::var("CATALOG_URL").ok(),
            )?
            .set_override_option(
                "backend.circulation_url",
                env::var("CIRCULATION_URL").ok(),
            )?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            catalog_url: "http://localhost:8080/api/v1".to_string(),
            circulation_url: "http://localhost:8080/api/v1".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            id_upper_bound: 1_000_000,
            search_page_size: 5,
            search_cooldown_seconds: 3,
            return_display_seconds: 2,
            export_dir: "exports".to_string(),
            preferences_file: "preferences.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
