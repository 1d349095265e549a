//! Circulation Service adapter
//!
//! Creates loans and processes returns against the circulation backend.
//! The scanner never compensates for partial batch failures; whatever the
//! backend reports is surfaced verbatim.

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::BatchResult,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CirculationClient: Send + Sync {
    /// Return one borrowed item
    async fn create_return(&self, item_id: i32) -> AppResult<()>;

    /// Create a batch of loans for one subject in a single backend call
    async fn create_loan_batch(&self, subject_id: i32, item_ids: &[i32]) -> AppResult<BatchResult>;
}

#[derive(Serialize)]
struct ReturnRequest {
    item_id: i32,
}

#[derive(Serialize)]
struct LoanBatchRequest<'a> {
    user_id: i32,
    item_ids: &'a [i32],
}

/// HTTP implementation over the circulation REST API
pub struct HttpCirculationClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCirculationClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn check(response: reqwest::Response, what: &str) -> AppResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        // Backend error bodies carry a human-readable message; pass it on
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| status.to_string());
        if status.is_client_error() {
            Err(AppError::BadRequest(format!("{}: {}", what, message)))
        } else {
            Err(AppError::BatchTotalFailure(format!("{}: {}", what, message)))
        }
    }
}

#[async_trait]
impl CirculationClient for HttpCirculationClient {
    async fn create_return(&self, item_id: i32) -> AppResult<()> {
        let url = format!("{}/loans/return", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ReturnRequest { item_id })
            .send()
            .await
            .map_err(|e| AppError::LookupFailed(format!("Return request failed: {}", e)))?;

        Self::check(response, "Return rejected").await?;
        Ok(())
    }

    async fn create_loan_batch(&self, subject_id: i32, item_ids: &[i32]) -> AppResult<BatchResult> {
        let url = format!("{}/loans/batch", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&LoanBatchRequest {
                user_id: subject_id,
                item_ids,
            })
            .send()
            .await
            .map_err(|e| AppError::BatchTotalFailure(format!("Batch request failed: {}", e)))?;

        let response = Self::check(response, "Batch loan rejected").await?;
        response
            .json()
            .await
            .map_err(|e| AppError::BatchTotalFailure(format!("Invalid batch response: {}", e)))
    }
}
