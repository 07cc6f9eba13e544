//! VTeacher Client
//!
//! Requests screens from the render server, caches them by location and
//! drives navigation.
//!
//! - `transport`: the network seam (`RenderTransport`, HTTP implementation)
//! - `tree`: immutable snapshots of a partially received render
//! - `cache`: location-keyed entries, one stream per key
//! - `navigation`: intents, history and the displayed screen
//! - `session`: owns the cache for the lifetime of a client

pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod navigation;
pub mod session;
pub mod transport;
pub mod tree;

pub use cache::{CacheEntry, CacheStats, EntryProgress, EntryState, RenderCache};
pub use commands::{parse_command, Command};
pub use config::{ClientConfig, ConfigError, NavigationConfig};
pub use error::ClientError;
pub use navigation::{NavigationController, NavigationOptions, NavigationOutcome, Screen};
pub use session::ClientSession;
pub use transport::{ChunkStream, HttpRenderTransport, RenderFuture, RenderResponse, RenderTransport};
pub use tree::{render_outline, RenderedTree, Subtree};
