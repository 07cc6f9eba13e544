//! Navigation controller
//!
//! Turns user intents (navigate, back, create/update/delete) into cache
//! lookups and swaps the displayed screen when a render completes. The
//! screen lives in a `watch` channel; every change to it is one
//! `send_if_modified` call, so observers never see a half-applied swap.
//!
//! Latest intent wins. Each intent takes a number under the screen lock, and
//! a completing render only swaps if its number is still the latest.

use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use vteacher_core::{Location, Mutation, RecordId, RecordInput};

use crate::cache::{CacheEntry, RenderCache};
use crate::error::ClientError;
use crate::transport::RenderTransport;
use crate::tree::RenderedTree;

/// What the UI shows.
#[derive(Debug, Clone)]
pub struct Screen {
    /// Location of the displayed tree.
    pub location: Location,
    pub tree: Option<Arc<RenderedTree>>,
    /// Visited resolved locations, oldest first. The last one is displayed.
    pub history: Vec<Location>,
    /// Dismissible failure of the latest intent.
    pub failure: Option<ClientError>,
    /// True while the latest intent is in flight.
    pub pending: bool,
    /// Number of the latest intent.
    pub intent: u64,
}

impl Screen {
    fn initial(location: Location) -> Self {
        Self {
            location,
            tree: None,
            history: Vec::new(),
            failure: None,
            pending: false,
            intent: 0,
        }
    }
}

/// How one intent ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The render completed and is now displayed.
    Displayed(Location),
    /// A newer intent was issued first; the result was dropped.
    Superseded,
    /// The stream was cancelled; nothing is shown.
    Cancelled,
    /// The render failed; the failure is shown and the old tree stays.
    Failed(ClientError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntentKind {
    Navigate,
    Mutate,
}

#[derive(Debug, Clone, Copy)]
pub struct NavigationOptions {
    pub initial_location: Location,
    /// Cancel the pending render of a superseded navigation.
    pub cancel_superseded: bool,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            initial_location: Location::list(),
            cancel_superseded: true,
        }
    }
}

pub struct NavigationController<T: RenderTransport> {
    transport: Arc<T>,
    cache: Arc<RenderCache>,
    screen: watch::Sender<Screen>,
    current: Mutex<Option<(CacheEntry, IntentKind)>>,
    cancel_superseded: bool,
}

impl<T: RenderTransport> NavigationController<T> {
    pub fn new(transport: Arc<T>, cache: Arc<RenderCache>, options: NavigationOptions) -> Arc<Self> {
        let (screen, _) = watch::channel(Screen::initial(options.initial_location));
        Arc::new(Self {
            transport,
            cache,
            screen,
            current: Mutex::new(None),
            cancel_superseded: options.cancel_superseded,
        })
    }

    pub fn screen(&self) -> Screen {
        self.screen.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Screen> {
        self.screen.subscribe()
    }

    pub fn cache(&self) -> &Arc<RenderCache> {
        &self.cache
    }

    /// Location of the displayed screen.
    pub fn current_location(&self) -> Location {
        self.screen.borrow().location
    }

    // ========================================================================
    // NAVIGATION
    // ========================================================================

    /// Navigate to `location`. The displayed tree stays until the render
    /// completes. Returns immediately; await the handle for the outcome.
    pub fn navigate(self: &Arc<Self>, location: Location) -> JoinHandle<NavigationOutcome> {
        self.visit(location, None)
    }

    /// Navigate to an encoded location. Malformed input is rejected before
    /// anything is sent.
    pub fn navigate_encoded(
        self: &Arc<Self>,
        encoded: &str,
    ) -> Result<JoinHandle<NavigationOutcome>, ClientError> {
        let location = Location::decode(encoded)?;
        Ok(self.navigate(location))
    }

    /// Go back one step in history. `None` when there is nowhere to go.
    ///
    /// History is only shortened once the previous screen is displayed; a
    /// failed or superseded back leaves it as it was.
    pub fn back(self: &Arc<Self>) -> Option<JoinHandle<NavigationOutcome>> {
        let (target, depth) = {
            let screen = self.screen.borrow();
            let depth = screen.history.len().checked_sub(1).filter(|depth| *depth > 0)?;
            (screen.history[depth - 1], depth)
        };
        Some(self.visit(target, Some(depth)))
    }

    fn visit(self: &Arc<Self>, location: Location, rewind: Option<usize>) -> JoinHandle<NavigationOutcome> {
        let key = location.encode();
        let transport = Arc::clone(&self.transport);
        let entry = self.cache.get_or_create(&key, move || {
            async move { transport.render(location).await }.boxed()
        });
        self.begin(entry, IntentKind::Navigate, rewind)
    }

    pub fn dismiss_failure(&self) {
        self.screen.send_if_modified(|screen| screen.failure.take().is_some());
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Create a record. The server redirects to the new record.
    pub fn create(self: &Arc<Self>, input: RecordInput) -> JoinHandle<NavigationOutcome> {
        let requested = self.current_location();
        self.mutate(Mutation::Create { input }, requested)
    }

    pub fn update(self: &Arc<Self>, id: RecordId, input: RecordInput) -> JoinHandle<NavigationOutcome> {
        self.mutate(Mutation::Update { id, input }, Location::selected(id))
    }

    /// Delete a record. Lands on the list if the record was on screen.
    pub fn delete(self: &Arc<Self>, id: RecordId) -> JoinHandle<NavigationOutcome> {
        let current = self.current_location();
        let requested = if current.selected_id == Some(id) {
            Location::list()
        } else {
            current
        };
        self.mutate(Mutation::Delete { id }, requested)
    }

    fn mutate(self: &Arc<Self>, mutation: Mutation, requested: Location) -> JoinHandle<NavigationOutcome> {
        tracing::info!(kind = mutation.kind(), target = ?mutation.target().map(|id| id.get()), "mutation");
        let key = requested.encode();
        let transport = Arc::clone(&self.transport);
        let entry = self.cache.invalidate_and_replace(&key, move || {
            async move { transport.mutate(mutation, requested).await }.boxed()
        });
        self.begin(entry, IntentKind::Mutate, None)
    }

    // ========================================================================
    // INTENT TRACKING
    // ========================================================================

    /// Start tracking `entry` as the latest intent. `rewind` is the history
    /// length to cut back to when the render is displayed.
    fn begin(
        self: &Arc<Self>,
        entry: CacheEntry,
        kind: IntentKind,
        rewind: Option<usize>,
    ) -> JoinHandle<NavigationOutcome> {
        let mut intent = 0;
        self.screen.send_modify(|screen| {
            screen.intent += 1;
            screen.pending = true;
            intent = screen.intent;
        });

        let previous = {
            let mut current = self
                .current
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            current.replace((entry.clone(), kind))
        };
        if let Some((previous, previous_kind)) = previous {
            // Mutation renders are never cancelled: the write may not have
            // reached the server yet.
            if self.cancel_superseded
                && previous_kind == IntentKind::Navigate
                && previous.seq() != entry.seq()
                && previous.is_pending()
            {
                tracing::debug!(key = %previous.key(), "cancelling superseded navigation");
                self.cache.release(&previous);
            }
        }

        let this = Arc::clone(self);
        tokio::spawn(async move { this.settle(intent, entry, rewind).await })
    }

    async fn settle(&self, intent: u64, entry: CacheEntry, rewind: Option<usize>) -> NavigationOutcome {
        match entry.wait().await {
            Ok(tree) => {
                let location = tree.location();
                let swapped = self.screen.send_if_modified(|screen| {
                    if screen.intent != intent {
                        return false;
                    }
                    screen.tree = Some(Arc::clone(&tree));
                    screen.location = location;
                    match rewind {
                        Some(depth) if depth > 0 && screen.history.get(depth - 1) == Some(&location) => {
                            screen.history.truncate(depth);
                        }
                        _ if screen.history.last() != Some(&location) => screen.history.push(location),
                        _ => {}
                    }
                    screen.failure = None;
                    screen.pending = false;
                    true
                });
                if swapped {
                    tracing::debug!(location = %location.to_json(), intent, "screen swapped");
                    NavigationOutcome::Displayed(location)
                } else {
                    tracing::debug!(location = %location.to_json(), intent, "stale render discarded");
                    NavigationOutcome::Superseded
                }
            }
            Err(ClientError::TransportCancelled) => {
                self.screen.send_if_modified(|screen| {
                    if screen.intent != intent {
                        return false;
                    }
                    screen.pending = false;
                    true
                });
                NavigationOutcome::Cancelled
            }
            Err(err) => {
                let current = self.screen.send_if_modified(|screen| {
                    if screen.intent != intent {
                        return false;
                    }
                    screen.failure = Some(err.clone());
                    screen.pending = false;
                    true
                });
                if current {
                    tracing::warn!(key = %entry.key(), error = %err, "navigation failed");
                    NavigationOutcome::Failed(err)
                } else {
                    NavigationOutcome::Superseded
                }
            }
        }
    }
}
