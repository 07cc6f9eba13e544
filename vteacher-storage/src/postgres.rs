//! PostgreSQL record store
//!
//! Connection pooling via deadpool-postgres. Records live in the `vteachers`
//! table; ids come from its serial key.

use crate::seed::demo_records;
use crate::RecordStore;
use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolError, RecyclingMethod, Runtime};
use std::time::Duration;
use tokio_postgres::{NoTls, Row};
use vteacher_core::{Record, RecordId, RecordInput, StoreError, StoreResult};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Time to wait for a pooled connection
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "vteachers".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("VTEACHER_DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("VTEACHER_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: std::env::var("VTEACHER_DB_NAME").unwrap_or(defaults.dbname),
            user: std::env::var("VTEACHER_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("VTEACHER_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("VTEACHER_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            timeout: std::env::var("VTEACHER_DB_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Create a connection pool from this configuration.
    ///
    /// No connection is opened until the first query.
    pub fn create_pool(&self) -> StoreResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StoreError::unavailable(format!("Failed to create pool: {}", e)))
    }
}

// ============================================================================
// SQL
// ============================================================================

const DROP_TABLE: &str = "DROP TABLE IF EXISTS vteachers";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS vteachers (
    id SERIAL PRIMARY KEY,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    title TEXT,
    body TEXT
)";

const INSERT_RECORD: &str = "INSERT INTO vteachers (title, body, created_at, updated_at)
    VALUES ($1, $2, $3, $3)
    RETURNING id, title, body, created_at, updated_at";

const UPDATE_RECORD: &str = "UPDATE vteachers SET title = $1, body = $2, updated_at = $3
    WHERE id = $4
    RETURNING id, title, body, created_at, updated_at";

const DELETE_RECORD: &str = "DELETE FROM vteachers WHERE id = $1";

const LIST_RECORDS: &str =
    "SELECT id, title, body, created_at, updated_at FROM vteachers ORDER BY id DESC";

const GET_RECORD: &str =
    "SELECT id, title, body, created_at, updated_at FROM vteachers WHERE id = $1";

// ============================================================================
// STORE
// ============================================================================

/// Record store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: Pool,
}

impl PgRecordStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn from_config(config: &DbConfig) -> StoreResult<Self> {
        Ok(Self::new(config.create_pool()?))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    async fn get_conn(&self) -> StoreResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(pool_error)
    }

    /// Create the `vteachers` table if it does not exist.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(CREATE_TABLE).await.map_err(db_error)
    }

    /// Drop and recreate the table, then insert the demo records.
    pub async fn reset_with_demo_records(&self) -> StoreResult<Vec<Record>> {
        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await.map_err(db_error)?;
        tx.batch_execute(DROP_TABLE).await.map_err(db_error)?;
        tx.batch_execute(CREATE_TABLE).await.map_err(db_error)?;

        let mut records = Vec::new();
        for seed in demo_records(Utc::now()) {
            let row = tx
                .query_one(
                    INSERT_RECORD,
                    &[&seed.input.title, &seed.input.body, &seed.created_at],
                )
                .await
                .map_err(db_error)?;
            records.push(record_from_row(&row)?);
        }
        tx.commit().await.map_err(db_error)?;
        tracing::info!(count = records.len(), "Seeded vteachers table");
        Ok(records)
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn create(&self, input: &RecordInput) -> StoreResult<Record> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_one(INSERT_RECORD, &[&input.title, &input.body, &Utc::now()])
            .await
            .map_err(db_error)?;
        record_from_row(&row)
    }

    async fn update(&self, id: RecordId, input: &RecordInput) -> StoreResult<Record> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                UPDATE_RECORD,
                &[&input.title, &input.body, &Utc::now(), &sql_id(id)?],
            )
            .await
            .map_err(db_error)?
            .ok_or(StoreError::NotFound { id })?;
        record_from_row(&row)
    }

    async fn delete(&self, id: RecordId) -> StoreResult<()> {
        let conn = self.get_conn().await?;
        let affected = conn
            .execute(DELETE_RECORD, &[&sql_id(id)?])
            .await
            .map_err(db_error)?;
        if affected == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<Record>> {
        let conn = self.get_conn().await?;
        let rows = conn.query(LIST_RECORDS, &[]).await.map_err(db_error)?;
        rows.iter().map(record_from_row).collect()
    }

    async fn get(&self, id: RecordId) -> StoreResult<Option<Record>> {
        let Ok(key) = sql_id(id) else {
            return Ok(None);
        };
        let conn = self.get_conn().await?;
        let row = conn.query_opt(GET_RECORD, &[&key]).await.map_err(db_error)?;
        row.as_ref().map(record_from_row).transpose()
    }
}

// ============================================================================
// ROW MAPPING AND ERROR CONVERSION
// ============================================================================

/// `SERIAL` columns are 32-bit.
fn sql_id(id: RecordId) -> StoreResult<i32> {
    i32::try_from(id.get()).map_err(|_| StoreError::NotFound { id })
}

fn record_from_row(row: &Row) -> StoreResult<Record> {
    let id: i32 = row.try_get("id").map_err(db_error)?;
    let id = RecordId::new(i64::from(id)).map_err(|e| StoreError::unavailable(e.to_string()))?;
    let title: Option<String> = row.try_get("title").map_err(db_error)?;
    let body: Option<String> = row.try_get("body").map_err(db_error)?;
    Ok(Record {
        id,
        title: title.unwrap_or_default(),
        body: body.unwrap_or_default(),
        created_at: row.try_get("created_at").map_err(db_error)?,
        updated_at: row.try_get("updated_at").map_err(db_error)?,
    })
}

fn db_error(err: tokio_postgres::Error) -> StoreError {
    tracing::error!("Database error: {:?}", err);
    StoreError::unavailable("Database operation failed")
}

fn pool_error(err: PoolError) -> StoreError {
    tracing::error!("Connection pool error: {:?}", err);
    match err {
        PoolError::Timeout(_) => StoreError::unavailable("Connection pool exhausted"),
        PoolError::Closed => StoreError::unavailable("Database connection pool is closed"),
        _ => StoreError::unavailable("Failed to acquire database connection"),
    }
}
