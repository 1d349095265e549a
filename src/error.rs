//! Error types for BibScan server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error codes exposed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    EmptyCode = 2,
    InvalidSubjectCode = 3,
    NoSuchItem = 4,
    LookupFailed = 5,
    Duplicate = 6,
    BatchFailed = 7,
    HardwareUnavailable = 8,
    ConfirmationRequired = 9,
    BadValue = 10,
    ConfigFailure = 11,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Empty code")]
    EmptyCode,

    #[error("Invalid subject code: {0}")]
    InvalidSubjectCode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Lookup failed: {0}")]
    LookupFailed(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Batch submission failed: {0}")]
    BatchTotalFailure(String),

    #[error("Hardware unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("Confirmation required: {0}")]
    ConfirmationRequired(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::EmptyCode => {
                (StatusCode::BAD_REQUEST, ErrorCode::EmptyCode, self.to_string())
            }
            AppError::InvalidSubjectCode(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::InvalidSubjectCode, msg.clone())
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchItem, msg.clone())
            }
            AppError::LookupFailed(msg) => {
                (StatusCode::BAD_GATEWAY, ErrorCode::LookupFailed, msg.clone())
            }
            AppError::Duplicate(msg) => {
                (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone())
            }
            AppError::BatchTotalFailure(msg) => {
                (StatusCode::BAD_GATEWAY, ErrorCode::BatchFailed, msg.clone())
            }
            AppError::HardwareUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::HardwareUnavailable, msg.clone())
            }
            AppError::ConfirmationRequired(msg) => {
                (StatusCode::CONFLICT, ErrorCode::ConfirmationRequired, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::ConfigFailure,
                    "Configuration error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
