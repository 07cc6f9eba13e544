//! HTTP Routes Module
//!
//! Includes:
//! - Screen render streams (`/react`)
//! - Record mutations that answer with a render stream, and JSON reads
//! - Health and latency-probe endpoints
//! - CORS support for browser-based clients

pub mod health;
pub mod records;
pub mod render;

use std::time::Duration;

use axum::{
    http::{header, header::HeaderName, HeaderValue, Method},
    Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use vteacher_core::{Location, LOCATION_HEADER};

use crate::config::ServerConfig;
use crate::error::ApiResult;
use crate::state::AppState;

/// `?location=` query parameter shared by render and mutation routes.
#[derive(Debug, Default, Deserialize)]
pub struct LocationQuery {
    pub location: Option<String>,
}

impl LocationQuery {
    /// Decode the location. An absent parameter means the list view.
    pub fn resolve(&self) -> ApiResult<Location> {
        match self.location.as_deref() {
            None => Ok(Location::list()),
            Some(raw) => Ok(Location::decode(raw)?),
        }
    }
}

fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([HeaderName::from_static(LOCATION_HEADER)])
        .max_age(Duration::from_secs(86400));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!("CORS: allowing origins: {:?}", config.cors_origins);
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Create the complete router with all routes and layers.
pub fn create_api_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .merge(render::create_router())
        .merge(records::create_router())
        .merge(health::create_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(config))
}
