use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Escrow error: {0}")]
    Escrow(#[from] EscrowError),

    #[error("Settlement error: {0}")]
    Settlement(#[from] SettlementError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Unauthorized")]
    Unauthorized,
}

/// Escrow ledger state machine errors. These mirror the on-chain program's
/// error set one-to-one so both sides reject for the same reasons.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowError {
    #[error("Escrow has not been initialized")]
    NotInitialized,

    #[error("Escrow is already initialized")]
    AlreadyInitialized,

    #[error("Only the admin can perform this action")]
    Unauthorized,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("NGO is not in the whitelist")]
    NgoNotFound,

    #[error("NGO is already in the whitelist")]
    NgoAlreadyExists,

    #[error("NGO has been deactivated")]
    NgoNotActive,

    #[error("NGO registry is at maximum capacity")]
    NgoRegistryFull,

    #[error("Sponsor is not in the registry")]
    SponsorNotFound,

    #[error("Sponsor is already in the registry")]
    SponsorAlreadyExists,

    #[error("Sponsor registry is at maximum capacity")]
    SponsorRegistryFull,

    #[error("Name exceeds maximum length (64 characters)")]
    NameTooLong,

    #[error("This week has already been processed")]
    WeekAlreadyProcessed,

    #[error("Batch exceeds maximum size")]
    BatchTooLarge,

    #[error("Batch cannot be empty")]
    EmptyBatch,

    #[error("Account list does not match allocation list")]
    AccountMismatch,

    #[error("Arithmetic overflow")]
    Overflow,
}

/// Errors crossing the settlement-layer boundary. `Rejected` carries a
/// validation verdict from the ledger; the rest are transport-class and
/// retryable once the underlying cause is fixed.
#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("Ledger rejected batch: {0}")]
    Rejected(#[from] EscrowError),

    #[error("Invalid settlement address: {0}")]
    InvalidAddress(String),

    #[error("Settlement layer transport error: {0}")]
    Transport(String),

    #[error("Settlement confirmation timed out")]
    Timeout,
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Unauthorized".to_string(),
            ),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Not found: {}", what),
            ),
            AppError::InvalidInput(msg) => (
                StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
                format!("Invalid input: {}", msg),
            ),
            AppError::AlreadyExists(what) => (
                StatusCode::CONFLICT,
                "ALREADY_EXISTS",
                format!("Already exists: {}", what),
            ),
            AppError::Escrow(EscrowError::Unauthorized) => (
                StatusCode::FORBIDDEN,
                "ESCROW_UNAUTHORIZED",
                "Only the admin can perform this action".to_string(),
            ),
            AppError::Escrow(EscrowError::WeekAlreadyProcessed) => (
                StatusCode::CONFLICT,
                "WEEK_ALREADY_PROCESSED",
                "This week has already been processed".to_string(),
            ),
            AppError::Escrow(
                e @ (EscrowError::NgoAlreadyExists | EscrowError::SponsorAlreadyExists),
            ) => (StatusCode::CONFLICT, "ESCROW_CONFLICT", e.to_string()),
            AppError::Escrow(e) => (StatusCode::BAD_REQUEST, "ESCROW_REJECTED", e.to_string()),
            AppError::Settlement(SettlementError::Timeout) => (
                StatusCode::GATEWAY_TIMEOUT,
                "SETTLEMENT_TIMEOUT",
                "Settlement confirmation timed out".to_string(),
            ),
            AppError::Settlement(e) => {
                (StatusCode::BAD_GATEWAY, "SETTLEMENT_FAILED", e.to_string())
            }
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(format!("{:?}", error))
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
