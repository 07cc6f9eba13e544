//! Error Types for the VTeacher API
//!
//! This module defines error handling for the server, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//! - BindError for classifying listener failures at startup
//!
//! Errors that happen before a render stream starts are returned as JSON with
//! an HTTP status. Errors after the stream has started travel in-band as a
//! terminal error frame instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use vteacher_core::{LocationError, StoreError};

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// The location parameter could not be decoded
    MalformedLocation,

    /// Request contains invalid input data
    InvalidInput,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested record does not exist
    RecordNotFound,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// The record store is unreachable
    StoreUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::MalformedLocation | ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorCode::RecordNotFound => StatusCode::NOT_FOUND,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    /// Create a MalformedLocation error.
    pub fn malformed_location(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedLocation, message)
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a RecordNotFound error.
    pub fn record_not_found(id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::RecordNotFound, format!("Record {} not found", id))
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Create a StoreUnavailable error.
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreUnavailable, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<LocationError> for ApiError {
    fn from(err: LocationError) -> Self {
        ApiError::malformed_location(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => ApiError::record_not_found(id),
            StoreError::Unavailable { reason } => {
                tracing::error!(%reason, "Record store unavailable");
                ApiError::store_unavailable(reason)
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON serialization error: {:?}", err);
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

// ============================================================================
// BIND ERRORS
// ============================================================================

/// Why the listener could not be bound.
///
/// Permission and address-in-use failures are configuration problems the
/// operator must fix; the server exits on both.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("Port {} requires elevated privileges", addr.port())]
    PermissionDenied { addr: SocketAddr },

    #[error("Port {} is already in use", addr.port())]
    AddrInUse { addr: SocketAddr },

    #[error("Failed to bind {addr}: {source}")]
    Other {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

impl BindError {
    /// Classify an I/O error returned by `TcpListener::bind`.
    pub fn classify(addr: SocketAddr, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => BindError::PermissionDenied { addr },
            std::io::ErrorKind::AddrInUse => BindError::AddrInUse { addr },
            _ => BindError::Other { addr, source: err },
        }
    }

    /// Whether the process should terminate instead of propagating.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BindError::PermissionDenied { .. } | BindError::AddrInUse { .. }
        )
    }
}

impl From<BindError> for ApiError {
    fn from(err: BindError) -> Self {
        ApiError::internal_error(err.to_string())
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
