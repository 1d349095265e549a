//! Batch submission
//!
//! Converts a finished mode session into backend calls or a local export.
//! Loan batches are one atomic-from-here call with no client-side retry:
//! retrying a partially-applied batch risks double-loaning copies, so
//! whatever the backend reports goes back to the operator untouched.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{BatchResult, InventoryReport},
    services::circulation::CirculationClient,
};

#[derive(Clone)]
pub struct BatchSubmitter {
    circulation: Arc<dyn CirculationClient>,
    export_dir: PathBuf,
}

impl BatchSubmitter {
    pub fn new(circulation: Arc<dyn CirculationClient>, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            circulation,
            export_dir: export_dir.into(),
        }
    }

    /// Submit a loan cart as one batch call
    pub async fn submit_loans(&self, subject_id: i32, item_ids: &[i32]) -> AppResult<BatchResult> {
        tracing::info!(
            "Submitting loan batch: subject {} with {} items",
            subject_id,
            item_ids.len()
        );
        let result = self.circulation.create_loan_batch(subject_id, item_ids).await?;
        if result.failure_count > 0 {
            tracing::warn!(
                "Loan batch partially failed: {} ok, {} failed",
                result.success_count,
                result.failure_count
            );
        }
        Ok(result)
    }

    /// Serialize an inventory report to a JSON file in the export
    /// directory. Local I/O failures are fatal; there is nothing to
    /// recover.
    pub fn export_inventory(&self, report: &InventoryReport) -> AppResult<PathBuf> {
        std::fs::create_dir_all(&self.export_dir)
            .map_err(|e| AppError::Internal(format!("Failed to create export dir: {}", e)))?;

        let now = Utc::now();
        let filename = format!(
            "inventory-report-{}-{}.json",
            now.format("%Y-%m-%d"),
            now.timestamp_millis()
        );
        let path = self.export_dir.join(filename);

        let json = serde_json::to_string_pretty(report)
            .map_err(|e| AppError::Internal(format!("Failed to serialize report: {}", e)))?;
        std::fs::write(&path, json)
            .map_err(|e| AppError::Internal(format!("Failed to write report: {}", e)))?;

        tracing::info!(
            "Exported inventory report ({} items) to {}",
            report.total_scanned,
            path.display()
        );
        Ok(path)
    }
}
