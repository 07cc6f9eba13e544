//! Error types for VTeacher core operations

use crate::RecordId;
use thiserror::Error;

/// Location codec errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("Malformed location {input:?}: {reason}")]
    Malformed { input: String, reason: String },

    #[error("Record id must be positive, got {value}")]
    InvalidRecordId { value: i64 },
}

impl LocationError {
    pub(crate) fn malformed(input: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Record store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Record {id} not found")]
    NotFound { id: RecordId },
}

impl StoreError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Stream framing errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Invalid frame at line {line}: {reason}")]
    InvalidFrame { line: usize, reason: String },

    #[error("Stream ended inside a frame ({pending} bytes buffered)")]
    Truncated { pending: usize },

    #[error("Failed to encode frame: {reason}")]
    Encode { reason: String },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
