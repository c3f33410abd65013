use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use thiserror::Error;

use crate::models::Tier;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::error::EncodeError),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] bincode::error::DecodeError),

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("User profile not found")]
    ProfileNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Analysis quota exceeded for tier {tier} ({limit} per period)")]
    QuotaExceeded {
        tier: Tier,
        limit: u32,
        period: String,
        resets_at: DateTime<Utc>,
    },

    #[error("Media too large: {size} bytes (max: {max})")]
    MediaTooLarge { size: usize, max: usize },

    #[error("Video too long: {actual_seconds}s (max for {tier}: {max_seconds}s)")]
    DurationExceeded {
        tier: Tier,
        max_seconds: u32,
        actual_seconds: f64,
    },

    #[error("Upstream analysis service is rate limited")]
    UpstreamRateLimited,

    #[error("Upstream returned a malformed response")]
    UpstreamMalformedResponse { excerpt: String },

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    #[error("Billing provider not configured")]
    BillingNotConfigured,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Internal error: {0}")]
    Internal(String),
}

fn internal(kind: &str, detail: &dyn std::fmt::Debug) -> (StatusCode, Value) {
    tracing::error!("{}: {:?}", kind, detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "Internal server error" }),
    )
}

/// Implement IntoResponse to convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Database(ref e) => internal("Database error", e),
            AppError::Transaction(ref e) => internal("Transaction error", e),
            AppError::Table(ref e) => internal("Table error", e),
            AppError::Storage(ref e) => internal("Storage error", e),
            AppError::Commit(ref e) => internal("Commit error", e),
            AppError::Serialization(ref e) => internal("Serialization error", e),
            AppError::Deserialization(ref e) => internal("Deserialization error", e),
            AppError::TaskJoin(ref e) => internal("Task join error", e),
            AppError::Internal(ref e) => internal("Internal error", e),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Unauthorized" }),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Invalid email or password" }),
            ),
            AppError::ProfileNotFound => (
                StatusCode::NOT_FOUND,
                json!({ "error": "User profile not found" }),
            ),
            AppError::UserNotFound => {
                (StatusCode::NOT_FOUND, json!({ "error": "User not found" }))
            }
            AppError::UserAlreadyExists => (
                StatusCode::CONFLICT,
                json!({ "error": "User already exists" }),
            ),
            AppError::InvalidInput(ref msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::QuotaExceeded {
                tier,
                limit,
                ref period,
                resets_at,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "error": "Analysis limit reached for this period",
                    "tier": tier,
                    "limit": limit,
                    "remaining": 0,
                    "currentMonth": period,
                    "resetsAt": resets_at,
                    "message": format!(
                        "You have used all {} analyses included in your {} plan. \
                         The limit resets on {}. Upgrade your plan for more analyses.",
                        limit,
                        tier,
                        resets_at.format("%B %-d")
                    ),
                }),
            ),
            AppError::MediaTooLarge { size, max } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Video file too large",
                    "message": format!(
                        "The recording is {:.1} MB; the maximum is {:.0} MB.",
                        size as f64 / (1024.0 * 1024.0),
                        max as f64 / (1024.0 * 1024.0)
                    ),
                }),
            ),
            AppError::DurationExceeded {
                tier,
                max_seconds,
                actual_seconds,
            } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Video too long",
                    "message": format!(
                        "Your {} plan allows videos up to {} minute(s). This video lasts {} minute(s).",
                        tier,
                        max_seconds / 60,
                        (actual_seconds / 60.0).ceil() as u64
                    ),
                }),
            ),
            AppError::UpstreamRateLimited => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "error": "Analysis service temporarily unavailable",
                    "message": "The analysis service is under heavy load. Please try again in a few minutes.",
                }),
            ),
            AppError::UpstreamMalformedResponse { ref excerpt } => {
                tracing::error!("Malformed upstream response: {}", excerpt);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "Error analyzing the video",
                        "message": "The analysis service returned an unreadable response.",
                        "rawResponse": excerpt,
                    }),
                )
            }
            AppError::Upstream(ref msg) => {
                tracing::error!("Upstream error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "Error analyzing the video",
                        "message": "An unexpected error occurred. Please try again.",
                    }),
                )
            }
            AppError::InvalidSignature => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Webhook signature verification failed" }),
            ),
            AppError::PaymentProvider(ref msg) => {
                tracing::error!("Payment provider error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({ "error": "Failed to verify subscription" }),
                )
            }
            AppError::BillingNotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "Billing provider not configured" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for application results
pub type Result<T> = std::result::Result<T, AppError>;
