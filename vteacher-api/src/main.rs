//! VTeacher API Server Entry Point
//!
//! Bootstraps configuration, opens the record store, and starts the Axum
//! HTTP server.

use vteacher_api::telemetry::init_tracing;
use vteacher_api::{create_api_router, open_store, ApiError, ApiResult, AppState, BindError, ServerConfig};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing()?;

    let config = ServerConfig::from_env()?;
    let store = open_store(config.store).await?;
    let app = create_api_router(AppState::new(store, config.stream_buffer), &config);

    let addr = config.bind_addr()?;
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            let err = BindError::classify(addr, err);
            if err.is_fatal() {
                tracing::error!(%addr, "{}", err);
                eprintln!("{}", err);
                std::process::exit(1);
            }
            return Err(err.into());
        }
    };
    tracing::info!(%addr, "Starting VTeacher API server");

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
