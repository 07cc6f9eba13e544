//! PostgreSQL store tests (require a reachable database, see `DbConfig::from_env`)

#![cfg(feature = "db-tests")]

use vteacher_storage::{DbConfig, PgRecordStore, RecordInput, RecordStore, StoreResult};

async fn test_store() -> StoreResult<PgRecordStore> {
    let store = PgRecordStore::from_config(&DbConfig::from_env())?;
    store.reset_with_demo_records().await?;
    Ok(store)
}

#[tokio::test]
async fn pg_crud_round_trip() -> StoreResult<()> {
    let store = test_store().await?;

    let listed = store.list().await?;
    assert_eq!(listed.len(), 4);
    assert!(listed.windows(2).all(|w| w[0].id > w[1].id));

    let created = store.create(&RecordInput::new("A", "alpha")).await?;
    assert_eq!(store.list().await?[0].id, created.id);

    let updated = store
        .update(created.id, &RecordInput::new("A2", "alpha two"))
        .await?;
    assert_eq!(store.get(created.id).await?, Some(updated));

    store.delete(created.id).await?;
    assert_eq!(store.get(created.id).await?, None);
    Ok(())
}
