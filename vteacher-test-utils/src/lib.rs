//! VTeacher Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Proptest generators for locations and record input
//! - Record fixtures
//! - A gated record store for observing what happens before reads complete

pub use vteacher_core::{Location, Record, RecordId, RecordInput, StoreError, StoreResult};
pub use vteacher_storage::{InMemoryRecordStore, RecordStore};

use async_trait::async_trait;
use chrono::Utc;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

// ============================================================================
// FIXTURES
// ============================================================================

/// Record id from a literal; panics on non-positive input.
pub fn record_id(value: i64) -> RecordId {
    match RecordId::new(value) {
        Ok(id) => id,
        Err(err) => panic!("invalid fixture id {}: {}", value, err),
    }
}

/// A record stamped with the current time.
pub fn record_fixture(id: i64, title: &str, body: &str) -> Record {
    let now = Utc::now();
    Record {
        id: record_id(id),
        title: title.to_string(),
        body: body.to_string(),
        created_at: now,
        updated_at: now,
    }
}

// ============================================================================
// GENERATORS
// ============================================================================

pub fn arb_record_id() -> impl Strategy<Value = RecordId> {
    (1i64..=i64::MAX).prop_map(record_id)
}

pub fn arb_location() -> impl Strategy<Value = Location> {
    prop_oneof![
        Just(Location::list()),
        arb_record_id().prop_map(Location::selected),
    ]
}

pub fn arb_record_input() -> impl Strategy<Value = RecordInput> {
    ("[A-Za-z][A-Za-z0-9 ]{0,40}", "[A-Za-z0-9 .,*_\\n]{0,200}")
        .prop_map(|(title, body)| RecordInput::new(title, body))
}

// ============================================================================
// GATED STORE
// ============================================================================

/// Wraps a store so that reads block until [`GatedRecordStore::open`] is
/// called. Writes pass straight through.
pub struct GatedRecordStore<S> {
    inner: S,
    gate: watch::Sender<bool>,
    reads_started: AtomicUsize,
}

impl<S: RecordStore> GatedRecordStore<S> {
    pub fn new(inner: S) -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            inner,
            gate,
            reads_started: AtomicUsize::new(0),
        }
    }

    /// Release every blocked and future read.
    pub fn open(&self) {
        self.gate.send_replace(true);
    }

    /// Number of reads that have reached the store (blocked or not).
    pub fn reads_started(&self) -> usize {
        self.reads_started.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        self.reads_started.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.gate.subscribe();
        // The sender lives in `self`, so this only errors if `self` is gone.
        let _ = rx.wait_for(|open| *open).await;
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for GatedRecordStore<S> {
    async fn create(&self, input: &RecordInput) -> StoreResult<Record> {
        self.inner.create(input).await
    }

    async fn update(&self, id: RecordId, input: &RecordInput) -> StoreResult<Record> {
        self.inner.update(id, input).await
    }

    async fn delete(&self, id: RecordId) -> StoreResult<()> {
        self.inner.delete(id).await
    }

    async fn list(&self) -> StoreResult<Vec<Record>> {
        self.wait().await;
        self.inner.list().await
    }

    async fn get(&self, id: RecordId) -> StoreResult<Option<Record>> {
        self.wait().await;
        self.inner.get(id).await
    }
}
