//! Error types for the client.
//!
//! `ClientError` is `Clone` because a failed cache entry hands the same error
//! to every caller waiting on it.

use vteacher_core::{FrameError, LocationError, StreamErrorCode};

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("Malformed location: {0}")]
    MalformedLocation(String),
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Render stream cancelled")]
    TransportCancelled,
    #[error("Transport failure: {0}")]
    TransportFailure(String),
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl ClientError {
    /// Cancellation is expected when navigation moves on; it is never shown.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::TransportCancelled)
    }

    /// Map a terminal error frame to the error it reports.
    pub fn from_stream_error(code: StreamErrorCode, message: String) -> Self {
        match code {
            StreamErrorCode::StoreUnavailable => ClientError::StoreUnavailable(message),
            StreamErrorCode::InternalError => ClientError::TransportFailure(message),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::TransportFailure(err.to_string())
    }
}

impl From<FrameError> for ClientError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Truncated { .. } => ClientError::TransportFailure(err.to_string()),
            _ => ClientError::InvalidResponse(err.to_string()),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Io(err.to_string())
    }
}

impl From<LocationError> for ClientError {
    fn from(err: LocationError) -> Self {
        ClientError::MalformedLocation(err.to_string())
    }
}

impl From<ConfigError> for ClientError {
    fn from(err: ConfigError) -> Self {
        ClientError::Config(err.to_string())
    }
}
