use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::migrate::MigrateError;
use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Settlement rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External error: {0}")]
    ExternalError(String),
}

/// Reasons a proposed settlement is refused before anything is written
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Amount must be greater than zero with at most two decimal places")]
    InvalidAmount,

    #[error("A ledger account is required for ledger payments")]
    MissingAccount,

    #[error("Insufficient wallet balance: requested {requested}, available {available}")]
    InsufficientWalletBalance { requested: Decimal, available: Decimal },

    #[error("Amount {requested} exceeds outstanding balance {outstanding}")]
    AmountExceedsOutstanding { requested: Decimal, outstanding: Decimal },
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::InvalidAmount => "INVALID_AMOUNT",
            ValidationError::MissingAccount => "MISSING_ACCOUNT",
            ValidationError::InsufficientWalletBalance { .. } => "INSUFFICIENT_WALLET_BALANCE",
            ValidationError::AmountExceedsOutstanding { .. } => "AMOUNT_EXCEEDS_OUTSTANDING",
        }
    }
}

/// Collaborator write failures while committing a settlement
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Wallet debit failed: {0}")]
    WalletDebitFailed(String),

    #[error("Payment could not be recorded: {0}")]
    PaymentWriteFailed(String),
}

/// Per-channel notification failures. Logged, never returned to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out after {0} ms")]
    TimedOut(u128),

    #[error("Channel task aborted: {0}")]
    Aborted(String),
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            AppError::Validation(rejection) => {
                let details = match &rejection {
                    ValidationError::InsufficientWalletBalance { requested, available } => {
                        Some(serde_json::json!({
                            "requested": requested.to_string(),
                            "available": available.to_string(),
                        }))
                    }
                    ValidationError::AmountExceedsOutstanding { requested, outstanding } => {
                        Some(serde_json::json!({
                            "requested": requested.to_string(),
                            "outstanding": outstanding.to_string(),
                        }))
                    }
                    _ => None,
                };
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    rejection.code(),
                    rejection.to_string(),
                    details,
                )
            }
            AppError::Execution(err) => (
                StatusCode::BAD_GATEWAY,
                "EXECUTION_FAILED",
                err.to_string(),
                None,
            ),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Not found: {}", what),
                None,
            ),
            AppError::InvalidInput(msg) => (
                StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
                msg,
                None,
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
                None,
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<rust_decimal::Error> for AppError {
    fn from(error: rust_decimal::Error) -> Self {
        AppError::InvalidInput(format!("Decimal conversion error: {:?}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::ExternalError(format!("HTTP request error: {:?}", error))
    }
}

impl From<MigrateError> for AppError {
    fn from(error: MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {:?}", error))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
