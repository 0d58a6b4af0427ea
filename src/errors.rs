use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Crate-wide error type. Mirrors the error kinds named in the scoring
/// and API contracts: auth/validation failures the API surfaces directly,
/// adapter failures that abort a single scoring run or degrade a single
/// cache read, and feed/parse failures ingestion tasks log and swallow.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing or incorrect API key")]
    AuthRejected,

    #[error("asn not found")]
    NotFound,

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("store error: {0}")]
    StoreError(String),

    #[error("feed error: {0}")]
    FeedError(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::AuthRejected => {
                HttpResponse::Forbidden().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::NotFound => {
                HttpResponse::NotFound().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::ValidationError(_) => {
                HttpResponse::BadRequest().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::StoreError(_) | AppError::FeedError(_) | AppError::ParseError(_) | AppError::Internal(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({ "error": self.to_string() }))
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::StoreError(e.to_string())
    }
}

impl From<clickhouse::error::Error> for AppError {
    fn from(e: clickhouse::error::Error) -> Self {
        AppError::StoreError(e.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::StoreError(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::FeedError(e.to_string())
    }
}
