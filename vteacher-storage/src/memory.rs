//! In-memory record store

use crate::seed::demo_records;
use crate::RecordStore;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use vteacher_core::{Record, RecordId, RecordInput, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<RecordId, Record>,
    next_id: i64,
}

impl Table {
    fn allocate_id(&mut self) -> StoreResult<RecordId> {
        self.next_id += 1;
        RecordId::new(self.next_id).map_err(|e| StoreError::unavailable(e.to_string()))
    }
}

/// Record store kept in process memory.
///
/// Ids are allocated from a counter, so listing by descending id is listing
/// newest first. The store can be switched offline to exercise
/// [`StoreError::Unavailable`] handling.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    table: RwLock<Table>,
    offline: AtomicBool,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with the demo records.
    pub fn seeded() -> Self {
        let mut table = Table::default();
        for seed in demo_records(Utc::now()) {
            table.next_id += 1;
            if let Ok(id) = RecordId::new(table.next_id) {
                table.rows.insert(
                    id,
                    Record {
                        id,
                        title: seed.input.title,
                        body: seed.input.body,
                        created_at: seed.created_at,
                        updated_at: seed.created_at,
                    },
                );
            }
        }
        Self {
            table: RwLock::new(table),
            offline: AtomicBool::new(false),
        }
    }

    /// Make every subsequent operation fail with `Unavailable` (or recover).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::unavailable("in-memory store is offline"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create(&self, input: &RecordInput) -> StoreResult<Record> {
        self.check_online()?;
        let mut table = self.table.write().await;
        let id = table.allocate_id()?;
        let now = Utc::now();
        let record = Record {
            id,
            title: input.title.clone(),
            body: input.body.clone(),
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(id, record.clone());
        tracing::debug!(record_id = %id, "Record created");
        Ok(record)
    }

    async fn update(&self, id: RecordId, input: &RecordInput) -> StoreResult<Record> {
        self.check_online()?;
        let mut table = self.table.write().await;
        let record = table.rows.get_mut(&id).ok_or(StoreError::NotFound { id })?;
        record.title = input.title.clone();
        record.body = input.body.clone();
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete(&self, id: RecordId) -> StoreResult<()> {
        self.check_online()?;
        let mut table = self.table.write().await;
        table
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound { id })
    }

    async fn list(&self) -> StoreResult<Vec<Record>> {
        self.check_online()?;
        let table = self.table.read().await;
        Ok(table.rows.values().rev().cloned().collect())
    }

    async fn get(&self, id: RecordId) -> StoreResult<Option<Record>> {
        self.check_online()?;
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }
}
