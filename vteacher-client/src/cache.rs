//! Location-keyed render cache
//!
//! Maps a canonical location key to a [`CacheEntry`]: a handle to one render
//! stream and the snapshots it has produced. Entries move
//! `Pending -> Ready | Failed` and never leave a terminal state. Each entry's
//! progress lives in a `watch` channel, so any number of callers can observe
//! or await the same stream without a second fetch.
//!
//! The cache is owned by a client session (see [`crate::session`]); there is
//! no global instance.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use vteacher_core::{Location, Node, SlotId};

use crate::error::ClientError;
use crate::transport::RenderFuture;
use crate::tree::{RenderedTree, Subtree};

// ============================================================================
// ENTRY STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    Pending,
    Ready,
    Failed(ClientError),
}

/// Observable progress of one entry.
#[derive(Debug, Clone)]
pub struct EntryProgress {
    pub state: EntryState,
    /// Latest snapshot. `None` until the server has answered.
    pub tree: Option<Arc<RenderedTree>>,
}

impl EntryProgress {
    fn pending() -> Self {
        Self {
            state: EntryState::Pending,
            tree: None,
        }
    }

    /// Terminal outcome, or `None` while pending.
    pub fn outcome(&self) -> Option<Result<Arc<RenderedTree>, ClientError>> {
        match &self.state {
            EntryState::Pending => None,
            EntryState::Failed(err) => Some(Err(err.clone())),
            EntryState::Ready => Some(self.tree.clone().ok_or_else(|| {
                ClientError::InvalidResponse("ready entry without a tree".to_string())
            })),
        }
    }
}

// ============================================================================
// CACHE ENTRY
// ============================================================================

/// Shared handle to one render stream. Cloning is cheap.
#[derive(Clone)]
pub struct CacheEntry {
    inner: Arc<EntryInner>,
}

struct EntryInner {
    key: String,
    seq: u64,
    progress: watch::Sender<EntryProgress>,
    task: OnceLock<AbortHandle>,
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.inner.key)
            .field("seq", &self.inner.seq)
            .field("state", &self.state())
            .finish()
    }
}

impl CacheEntry {
    fn new(key: &str, seq: u64) -> Self {
        let (progress, _) = watch::channel(EntryProgress::pending());
        Self {
            inner: Arc::new(EntryInner {
                key: key.to_string(),
                seq,
                progress,
                task: OnceLock::new(),
            }),
        }
    }

    /// The key this entry was requested under.
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Creation order within the owning cache.
    pub fn seq(&self) -> u64 {
        self.inner.seq
    }

    pub fn state(&self) -> EntryState {
        self.inner.progress.borrow().state.clone()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.inner.progress.borrow().state, EntryState::Pending)
    }

    /// Pending or Ready. Failed entries are replaced on the next lookup.
    pub fn is_live(&self) -> bool {
        !matches!(self.inner.progress.borrow().state, EntryState::Failed(_))
    }

    pub fn progress(&self) -> EntryProgress {
        self.inner.progress.borrow().clone()
    }

    pub fn snapshot(&self) -> Option<Arc<RenderedTree>> {
        self.inner.progress.borrow().tree.clone()
    }

    /// The location the server resolved, once it has answered.
    pub fn resolved_location(&self) -> Option<Location> {
        self.inner
            .progress
            .borrow()
            .tree
            .as_ref()
            .map(|tree| tree.location())
    }

    pub fn subscribe(&self) -> watch::Receiver<EntryProgress> {
        self.inner.progress.subscribe()
    }

    /// Wait for the terminal state and return the completed tree.
    pub async fn wait(&self) -> Result<Arc<RenderedTree>, ClientError> {
        let mut rx = self.subscribe();
        let outcome = {
            let progress = rx
                .wait_for(|progress| progress.state != EntryState::Pending)
                .await
                .map_err(|_| ClientError::TransportFailure("render entry dropped".to_string()))?;
            progress.outcome()
        };
        outcome.unwrap_or_else(|| {
            Err(ClientError::TransportFailure(
                "render entry still pending".to_string(),
            ))
        })
    }

    /// Suspend until `slot` has been resolved and return its subtree.
    ///
    /// Fails with the entry's error if the stream fails first, and with
    /// `InvalidResponse` if the stream completes without the slot.
    pub async fn resolve(&self, slot: SlotId) -> Result<Node, ClientError> {
        let mut rx = self.subscribe();
        let progress = {
            let progress = rx
                .wait_for(|progress| {
                    progress.state != EntryState::Pending
                        || progress
                            .tree
                            .as_ref()
                            .is_some_and(|tree| matches!(tree.subtree(slot), Subtree::Resolved(_)))
                })
                .await
                .map_err(|_| ClientError::TransportFailure("render entry dropped".to_string()))?;
            progress.clone()
        };

        if let Some(tree) = &progress.tree {
            if let Subtree::Resolved(node) = tree.subtree(slot) {
                return Ok(node.clone());
            }
        }
        match progress.state {
            EntryState::Failed(err) => Err(err),
            _ => Err(ClientError::InvalidResponse(format!(
                "slot {} was never resolved",
                slot
            ))),
        }
    }

    /// Cancel a pending stream. Returns false if the entry was already
    /// terminal.
    pub fn cancel(&self) -> bool {
        let cancelled = self.fail(ClientError::TransportCancelled);
        if cancelled {
            if let Some(task) = self.inner.task.get() {
                task.abort();
            }
            tracing::debug!(key = %self.inner.key, seq = self.inner.seq, "render stream cancelled");
        }
        cancelled
    }

    fn publish(&self, tree: RenderedTree) -> bool {
        let tree = Arc::new(tree);
        self.inner.progress.send_if_modified(|progress| {
            if progress.state != EntryState::Pending {
                return false;
            }
            progress.tree = Some(tree);
            true
        })
    }

    fn finish(&self) -> bool {
        self.inner.progress.send_if_modified(|progress| {
            if progress.state != EntryState::Pending {
                return false;
            }
            progress.state = EntryState::Ready;
            true
        })
    }

    fn fail(&self, err: ClientError) -> bool {
        self.inner.progress.send_if_modified(|progress| {
            if progress.state != EntryState::Pending {
                return false;
            }
            progress.state = EntryState::Failed(err);
            true
        })
    }
}

// ============================================================================
// STATISTICS
// ============================================================================

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered by a live entry.
    pub hits: u64,
    /// Lookups that started a fetch.
    pub misses: u64,
    /// Number of entries currently mapped.
    pub entry_count: u64,
    /// Mutation renders not yet installed.
    pub pending_replacements: u64,
    /// Entries removed by replacement, release or eviction.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// ============================================================================
// RENDER CACHE
// ============================================================================

type ReadyHook = Box<dyn FnOnce(&CacheEntry) + Send>;

#[derive(Default)]
pub struct RenderCache {
    entries: DashMap<String, CacheEntry>,
    /// Replacement entries in flight, by seq. Not reachable by key until Ready.
    replacements: DashMap<u64, CacheEntry>,
    next_seq: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl fmt::Debug for RenderCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderCache")
            .field("stats", &self.stats())
            .finish()
    }
}

impl RenderCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Return the live entry for `key`, or create one and start `factory`.
    ///
    /// Lookup and insert happen under one shard lock, so concurrent callers
    /// for the same key share a single stream. `factory` is called at most
    /// once, and only by the caller that inserted the entry.
    pub fn get_or_create<F>(self: &Arc<Self>, key: &str, factory: F) -> CacheEntry
    where
        F: FnOnce() -> RenderFuture,
    {
        let (entry, created) = match self.entries.entry(key.to_string()) {
            Entry::Occupied(occupied) if occupied.get().is_live() => (occupied.get().clone(), false),
            Entry::Occupied(mut occupied) => {
                let entry = self.new_entry(key);
                occupied.insert(entry.clone());
                (entry, true)
            }
            Entry::Vacant(vacant) => {
                let entry = self.new_entry(key);
                vacant.insert(entry.clone());
                (entry, true)
            }
        };

        if created {
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, seq = entry.seq(), "cache miss, starting render");
            self.spawn_fetch(&entry, factory(), None);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(key = %key, seq = entry.seq(), "cache hit");
        }
        entry
    }

    /// Start a fresh fetch regardless of what `key` maps to.
    ///
    /// On Ready the entry is installed under the location the server
    /// resolved, unless that key already maps to a newer entry, and every
    /// entry older than it is evicted without being cancelled. The returned handle is the
    /// new entry even when the resolved key differs from `key`.
    pub fn invalidate_and_replace<F>(self: &Arc<Self>, key: &str, factory: F) -> CacheEntry
    where
        F: FnOnce() -> RenderFuture,
    {
        let entry = self.new_entry(key);
        self.replacements.insert(entry.seq(), entry.clone());
        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key = %key, seq = entry.seq(), "starting replacement render");

        let cache: Weak<RenderCache> = Arc::downgrade(self);
        let hook: ReadyHook = Box::new(move |ready: &CacheEntry| {
            if let Some(cache) = cache.upgrade() {
                cache.install(ready);
            }
        });
        self.spawn_fetch(&entry, factory(), Some(hook));
        entry
    }

    /// Drop every entry and cancel the pending ones.
    pub fn evict_all(&self) {
        let mut dropped = Vec::new();
        self.entries.retain(|_, entry| {
            dropped.push(entry.clone());
            false
        });
        self.replacements.retain(|_, entry| {
            dropped.push(entry.clone());
            false
        });
        let cancelled = dropped.iter().filter(|entry| entry.cancel()).count();
        self.evictions
            .fetch_add(dropped.len() as u64, Ordering::Relaxed);
        tracing::info!(evicted = dropped.len(), cancelled, "render cache cleared");
    }

    /// Cancel a pending entry nobody needs any more and unmap it.
    ///
    /// Only removes the mapping if it still points at this exact entry.
    /// Ready and Failed entries are left alone.
    pub fn release(&self, entry: &CacheEntry) {
        if !entry.is_pending() {
            return;
        }
        let seq = entry.seq();
        if self
            .entries
            .remove_if(entry.key(), |_, mapped| mapped.seq() == seq)
            .is_some()
        {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.replacements.remove(&seq);
        entry.cancel();
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.len() as u64,
            pending_replacements: self.replacements.len() as u64,
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn new_entry(&self, key: &str) -> CacheEntry {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        CacheEntry::new(key, seq)
    }

    fn spawn_fetch(&self, entry: &CacheEntry, fetch: RenderFuture, on_ready: Option<ReadyHook>) {
        let handle = tokio::spawn(drive(entry.clone(), fetch, on_ready));
        // The entry may have been cancelled before the task existed.
        if entry.inner.task.set(handle.abort_handle()).is_err() || !entry.is_pending() {
            handle.abort();
        }
    }

    /// Map a ready replacement under its resolved key and evict older entries.
    fn install(&self, ready: &CacheEntry) {
        self.replacements.remove(&ready.seq());
        if !ready.is_pending() {
            return;
        }
        let key = ready
            .resolved_location()
            .map(|location| location.encode())
            .unwrap_or_else(|| ready.key().to_string());
        let seq = ready.seq();

        let installed = match self.entries.entry(key.clone()) {
            Entry::Occupied(occupied) if occupied.get().seq() > seq => false,
            Entry::Occupied(mut occupied) => {
                occupied.insert(ready.clone());
                true
            }
            Entry::Vacant(vacant) => {
                vacant.insert(ready.clone());
                true
            }
        };
        if !installed {
            tracing::debug!(
                requested = %ready.key(),
                resolved = %key,
                seq,
                "newer entry already mapped, replacement not installed"
            );
            return;
        }

        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.seq() >= seq);
        let evicted = before.saturating_sub(self.entries.len());
        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        tracing::debug!(
            requested = %ready.key(),
            resolved = %key,
            seq,
            evicted,
            "replacement installed"
        );
    }
}

/// Run one render: await the response, publish a snapshot per chunk, settle
/// the entry.
async fn drive(entry: CacheEntry, fetch: RenderFuture, on_ready: Option<ReadyHook>) {
    let response = match fetch.await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(key = %entry.key(), error = %err, "render request failed");
            entry.fail(err);
            return;
        }
    };

    let mut tree = RenderedTree::new(response.location);
    entry.publish(tree.clone());
    let mut chunks = response.chunks;
    while let Some(item) = chunks.next().await {
        let next = item.and_then(|chunk| tree.apply(chunk));
        match next {
            Ok(next) => {
                tree = next;
                entry.publish(tree.clone());
                if tree.is_complete() {
                    break;
                }
            }
            Err(err) => {
                tracing::warn!(key = %entry.key(), error = %err, "render stream failed");
                entry.fail(err);
                return;
            }
        }
    }

    if !tree.is_complete() {
        entry.fail(ClientError::TransportFailure(
            "render stream ended before completion".to_string(),
        ));
        return;
    }
    if let Some(hook) = on_ready {
        hook(&entry);
    }
    entry.finish();
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..CacheStats::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[tokio::test]
    async fn test_terminal_state_is_final() {
        let entry = CacheEntry::new("k", 1);
        assert!(entry.fail(ClientError::TransportFailure("boom".into())));
        assert!(!entry.finish());
        assert!(!entry.cancel());
        assert_eq!(
            entry.state(),
            EntryState::Failed(ClientError::TransportFailure("boom".into()))
        );
    }

    #[tokio::test]
    async fn test_failed_request_fails_entry() {
        let cache = RenderCache::new();
        let entry = cache.get_or_create("k", || {
            async { Err(ClientError::StoreUnavailable("down".into())) }.boxed()
        });
        assert_eq!(
            entry.wait().await.unwrap_err(),
            ClientError::StoreUnavailable("down".into())
        );
        assert!(!entry.is_live());
    }

    #[tokio::test]
    async fn test_cancel_pending_entry() {
        let cache = RenderCache::new();
        let entry = cache.get_or_create("k", || futures_util::future::pending().boxed());
        assert!(entry.cancel());
        assert_eq!(entry.wait().await.unwrap_err(), ClientError::TransportCancelled);
    }
}
