//! Shared application state for Axum routers.

use std::sync::Arc;

use vteacher_storage::RecordStore;

use crate::render::RenderEngine;

/// Store handle used by the server, backend chosen at startup.
pub type DynRecordStore = dyn RecordStore;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub engine: RenderEngine<DynRecordStore>,
    /// Frames buffered per render stream.
    pub stream_buffer: usize,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(store: Arc<DynRecordStore>, stream_buffer: usize) -> Self {
        Self {
            engine: RenderEngine::new(store),
            stream_buffer,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn store(&self) -> &Arc<DynRecordStore> {
        self.engine.store()
    }
}
