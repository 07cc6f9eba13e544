//! VTeacher API - Render Server
//!
//! Serves screens as streamed render trees and accepts record mutations that
//! answer with the re-rendered screen.
//!
//! Layout:
//! - `render`: the render engine (location -> chunk stream)
//! - `stream`: the HTTP stream transport (chunk stream -> NDJSON response)
//! - `routes`: axum handlers
//! - `config`, `telemetry`, `error`: server plumbing

pub mod config;
pub mod error;
pub mod render;
pub mod routes;
pub mod state;
pub mod stream;
pub mod telemetry;

use std::sync::Arc;

pub use config::{ServerConfig, StoreBackend};
pub use error::{ApiError, ApiResult, BindError, ErrorCode};
pub use render::{RenderEngine, RenderError, RenderStream};
pub use routes::create_api_router;
pub use state::{AppState, DynRecordStore};

use vteacher_storage::{DbConfig, InMemoryRecordStore, PgRecordStore};

/// Open the configured record store.
pub async fn open_store(backend: StoreBackend) -> ApiResult<Arc<DynRecordStore>> {
    match backend {
        StoreBackend::Memory => {
            tracing::info!("Using seeded in-memory record store");
            Ok(Arc::new(InMemoryRecordStore::seeded()))
        }
        StoreBackend::Postgres => {
            let db_config = DbConfig::from_env();
            tracing::info!(host = %db_config.host, dbname = %db_config.dbname, "Using PostgreSQL record store");
            let store = PgRecordStore::from_config(&db_config)?;
            store.ensure_schema().await?;
            Ok(Arc::new(store))
        }
    }
}
