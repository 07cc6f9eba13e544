//! Client session: owns the render cache for its lifetime.

use std::sync::Arc;

use crate::cache::RenderCache;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::navigation::{NavigationController, NavigationOptions};
use crate::transport::{HttpRenderTransport, RenderTransport};

/// Dropping the session evicts the cache and cancels its pending streams.
pub struct ClientSession<T: RenderTransport> {
    cache: Arc<RenderCache>,
    controller: Arc<NavigationController<T>>,
}

impl<T: RenderTransport> ClientSession<T> {
    pub fn new(transport: T, options: NavigationOptions) -> Self {
        let cache = RenderCache::new();
        let controller = NavigationController::new(Arc::new(transport), Arc::clone(&cache), options);
        Self { cache, controller }
    }

    pub fn controller(&self) -> &Arc<NavigationController<T>> {
        &self.controller
    }

    pub fn cache(&self) -> &Arc<RenderCache> {
        &self.cache
    }
}

impl ClientSession<HttpRenderTransport> {
    /// Session against the server named in `config`.
    pub fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        let transport = HttpRenderTransport::new(config)?;
        let options = NavigationOptions {
            initial_location: config.initial_location()?,
            cancel_superseded: config.navigation.cancel_superseded,
        };
        tracing::info!(api = %transport.base_url(), "client session started");
        Ok(Self::new(transport, options))
    }
}

impl<T: RenderTransport> Drop for ClientSession<T> {
    fn drop(&mut self) {
        self.cache.evict_all();
    }
}
