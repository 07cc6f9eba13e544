//! Server Configuration Module
//!
//! Configuration is loaded from environment variables with defaults suitable
//! for local development.

use std::net::SocketAddr;

use crate::error::{ApiError, ApiResult};

/// Which record store backend the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Seeded in-process store.
    Memory,
    /// PostgreSQL via `DbConfig::from_env`.
    Postgres,
}

impl std::str::FromStr for StoreBackend {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            other => Err(ApiError::invalid_input(format!(
                "Unknown store backend '{}', expected 'memory' or 'postgres'",
                other
            ))),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Raw port value; validated by [`ServerConfig::bind_addr`].
    pub port: String,
    /// Record store backend.
    pub store: StoreBackend,
    /// Allowed CORS origins. Empty allows all (dev mode).
    pub cors_origins: Vec<String>,
    /// Frames buffered per render stream before the producer waits.
    pub stream_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: "4000".to_string(),
            store: StoreBackend::Memory,
            cors_origins: Vec::new(),
            stream_buffer: 16,
        }
    }
}

impl ServerConfig {
    /// Create ServerConfig from environment variables.
    ///
    /// Environment variables:
    /// - `VTEACHER_API_BIND`: interface to bind (default: 0.0.0.0)
    /// - `PORT`, then `VTEACHER_API_PORT`: listen port (default: 4000)
    /// - `VTEACHER_STORE`: `memory` or `postgres` (default: memory)
    /// - `VTEACHER_CORS_ORIGINS`: comma-separated allowed origins (empty = allow all)
    /// - `VTEACHER_STREAM_BUFFER`: frames buffered per stream (default: 16)
    pub fn from_env() -> ApiResult<Self> {
        let defaults = Self::default();

        let store = match std::env::var("VTEACHER_STORE") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.store,
        };

        let cors_origins = std::env::var("VTEACHER_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let stream_buffer = std::env::var("VTEACHER_STREAM_BUFFER")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(defaults.stream_buffer);

        Ok(Self {
            host: std::env::var("VTEACHER_API_BIND").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .or_else(|| std::env::var("VTEACHER_API_PORT").ok())
                .unwrap_or(defaults.port),
            store,
            cors_origins,
            stream_buffer,
        })
    }

    /// Resolve the socket address to bind.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let port = self.port.trim().parse::<u16>().map_err(|_| {
            ApiError::invalid_input(format!("Invalid port value: {}", self.port))
        })?;

        let addr = format!("{}:{}", self.host, port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
        })
    }
}
