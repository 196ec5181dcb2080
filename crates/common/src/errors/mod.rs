//! Error types for TripForge services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - User-facing messages for terminal planning failures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,

    // Planning outcomes (4xxx)
    NothingExtracted,

    // Rate limiting (6xxx)
    RateLimited,

    // External service errors (8xxx)
    UpstreamError,
    GraphUnavailable,
    GraphTimeout,
    GenerationUnavailable,
    GenerationTimeout,
    EntityRecognitionError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,

            ErrorCode::NothingExtracted => 4010,

            ErrorCode::RateLimited => 6001,

            ErrorCode::UpstreamError => 8001,
            ErrorCode::GraphUnavailable => 8010,
            ErrorCode::GraphTimeout => 8011,
            ErrorCode::GenerationUnavailable => 8020,
            ErrorCode::GenerationTimeout => 8021,
            ErrorCode::EntityRecognitionError => 8030,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    // Planning outcomes
    #[error("No travel information could be extracted from the query")]
    NothingExtracted,

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Knowledge graph (recovered inside the retriever, surfaced by readiness checks)
    #[error("Knowledge graph unavailable: {message}")]
    GraphUnavailable { message: String },

    #[error("Knowledge graph query timed out after {timeout_ms}ms")]
    GraphTimeout { timeout_ms: u64 },

    // Generation gateway (terminal for the request)
    #[error("Generation service unavailable: {message}")]
    GenerationUnavailable { message: String },

    #[error("Generation timed out after {timeout_secs}s")]
    GenerationTimeout { timeout_secs: u64 },

    // Entity recognition (recovered inside the extractor)
    #[error("Entity recognition failed: {message}")]
    EntityRecognition { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::NothingExtracted => ErrorCode::NothingExtracted,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::GraphUnavailable { .. } => ErrorCode::GraphUnavailable,
            AppError::GraphTimeout { .. } => ErrorCode::GraphTimeout,
            AppError::GenerationUnavailable { .. } => ErrorCode::GenerationUnavailable,
            AppError::GenerationTimeout { .. } => ErrorCode::GenerationTimeout,
            AppError::EntityRecognition { .. } => ErrorCode::EntityRecognitionError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,

            // 422 Unprocessable Entity
            AppError::NothingExtracted => StatusCode::UNPROCESSABLE_ENTITY,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::GraphUnavailable { .. }
            | AppError::GenerationUnavailable { .. }
            | AppError::EntityRecognition { .. }
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 504 Gateway Timeout
            AppError::GraphTimeout { .. } | AppError::GenerationTimeout { .. } => {
                StatusCode::GATEWAY_TIMEOUT
            }
        }
    }

    /// Message suitable for showing to the traveller.
    ///
    /// Generation failures and empty extractions get distinct wording so a
    /// front end can tell "try again later" apart from "rephrase your query".
    pub fn user_message(&self) -> String {
        match self {
            AppError::GenerationUnavailable { .. } | AppError::GenerationTimeout { .. } => {
                "We could not reach the itinerary generation service. Please try again later."
                    .to_string()
            }
            AppError::NothingExtracted => {
                "No travel information could be extracted from your query. Try naming a \
                destination, a trip length, or a budget."
                    .to_string()
            }
            AppError::RateLimited { .. } => {
                "Too many planning requests right now. Please slow down.".to_string()
            }
            AppError::Validation { message, .. } => message.clone(),
            _ => "Something went wrong while planning your trip.".to_string(),
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let internal = self.to_string();

        if self.is_server_error() {
            tracing::error!(
                error = %internal,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %internal,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message: self.user_message(),
                details: Some(serde_json::json!({ "reason": internal })),
                request_id: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
