//! VTeacher Storage - Record Store Gateway
//!
//! The render engine reads and writes records only through [`RecordStore`].
//! Two backends are provided:
//! - [`InMemoryRecordStore`] for development and tests
//! - [`PgRecordStore`] on a pooled PostgreSQL connection
//!
//! Every operation may fail with [`StoreError::Unavailable`]. A missing
//! record is reported as `Ok(None)` from [`RecordStore::get`] and as
//! [`StoreError::NotFound`] from writes.

mod memory;
mod postgres;
pub mod seed;

pub use memory::InMemoryRecordStore;
pub use postgres::{DbConfig, PgRecordStore};
pub use vteacher_core::{Record, RecordId, RecordInput, StoreError, StoreResult};

use async_trait::async_trait;
use std::sync::Arc;

/// Narrow gateway to the record table.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a record and return it with its assigned id.
    async fn create(&self, input: &RecordInput) -> StoreResult<Record>;

    /// Overwrite title and body of an existing record.
    async fn update(&self, id: RecordId, input: &RecordInput) -> StoreResult<Record>;

    /// Remove a record.
    async fn delete(&self, id: RecordId) -> StoreResult<()>;

    /// All records, newest first.
    async fn list(&self) -> StoreResult<Vec<Record>>;

    /// One record, or `None` if it does not exist.
    async fn get(&self, id: RecordId) -> StoreResult<Option<Record>>;
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    async fn create(&self, input: &RecordInput) -> StoreResult<Record> {
        (**self).create(input).await
    }

    async fn update(&self, id: RecordId, input: &RecordInput) -> StoreResult<Record> {
        (**self).update(id, input).await
    }

    async fn delete(&self, id: RecordId) -> StoreResult<()> {
        (**self).delete(id).await
    }

    async fn list(&self) -> StoreResult<Vec<Record>> {
        (**self).list().await
    }

    async fn get(&self, id: RecordId) -> StoreResult<Option<Record>> {
        (**self).get(id).await
    }
}
