//! Recreate the `vteachers` table and insert the demo records.
//!
//! Connection settings come from the `VTEACHER_DB_*` environment variables.

use vteacher_api::telemetry::init_tracing;
use vteacher_api::ApiResult;
use vteacher_storage::{DbConfig, PgRecordStore};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing()?;

    let store = PgRecordStore::from_config(&DbConfig::from_env())?;
    let records = store.reset_with_demo_records().await?;
    for record in &records {
        tracing::info!(record_id = %record.id, title = %record.title, "Seeded record");
    }
    Ok(())
}
