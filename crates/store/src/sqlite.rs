//! SQLite key-value backend.
//!
//! Uses a single table keyed by `(store, key)` so several logical stores can
//! share one database file:
//! - `kv_state` — `store`, `key`, `value` (JSON text), `updated_at`
//!
//! Connection and I/O failures are reported as `KvError::Unavailable` so
//! callers can retry; everything else is `KvError::Storage`.

use async_trait::async_trait;
use chrono::Utc;
use slotboard_core::error::KvError;
use slotboard_core::kv::{KvBackend, KvOp};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};

/// A SQLite-backed key-value store.
pub struct SqliteKv {
    pool: SqlitePool,
    store: String,
}

impl SqliteKv {
    /// Open (or create) a database.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(url: &str, store: &str) -> Result<Self, KvError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| KvError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // An in-memory database exists per connection, so pin it to one
        let max_connections = if url.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(map_sqlx)?;

        let backend = Self::from_pool(pool, store).await?;
        info!(url, store, "SQLite key-value backend initialized");
        Ok(backend)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool, store: &str) -> Result<Self, KvError> {
        let backend = Self {
            pool,
            store: store.to_string(),
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    async fn run_migrations(&self) -> Result<(), KvError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_state (
                store      TEXT NOT NULL,
                key        TEXT NOT NULL,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (store, key)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| KvError::Storage(format!("kv_state table: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }
}

/// Pool and I/O trouble is transient; anything the database rejected is not.
fn map_sqlx(e: sqlx::Error) -> KvError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => KvError::Unavailable(e.to_string()),
        other => KvError::Storage(other.to_string()),
    }
}

const UPSERT_SQL: &str = r#"
    INSERT INTO kv_state (store, key, value, updated_at)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(store, key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
"#;

const DELETE_SQL: &str = "DELETE FROM kv_state WHERE store = ?1 AND key = ?2";

#[async_trait]
impl KvBackend for SqliteKv {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let row = sqlx::query("SELECT value FROM kv_state WHERE store = ?1 AND key = ?2")
            .bind(&self.store)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        row.map(|r| r.try_get::<String, _>("value"))
            .transpose()
            .map_err(map_sqlx)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        sqlx::query(UPSERT_SQL)
            .bind(&self.store)
            .bind(key)
            .bind(&value)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        sqlx::query(DELETE_SQL)
            .bind(&self.store)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn bulk_get(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>, KvError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT key, value FROM kv_state WHERE store = ");
        query.push_bind(&self.store);
        query.push(" AND key IN (");
        let mut separated = query.separated(", ");
        for key in keys {
            separated.push_bind(key);
        }
        separated.push_unseparated(")");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        let mut found: HashMap<String, String> = HashMap::with_capacity(rows.len());
        for row in rows {
            let key: String = row.try_get("key").map_err(map_sqlx)?;
            let value: String = row.try_get("value").map_err(map_sqlx)?;
            found.insert(key, value);
        }

        Ok(keys
            .iter()
            .map(|k| (k.clone(), found.get(k).cloned()))
            .collect())
    }

    async fn execute_transaction(&self, ops: Vec<KvOp>) -> Result<(), KvError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        for op in &ops {
            match op {
                KvOp::Upsert { key, value } => {
                    sqlx::query(UPSERT_SQL)
                        .bind(&self.store)
                        .bind(key)
                        .bind(value)
                        .bind(&now)
                        .execute(&mut *tx)
                        .await
                        .map_err(map_sqlx)?;
                }
                KvOp::Delete { key } => {
                    sqlx::query(DELETE_SQL)
                        .bind(&self.store)
                        .bind(key)
                        .execute(&mut *tx)
                        .await
                        .map_err(map_sqlx)?;
                }
            }
        }

        tx.commit().await.map_err(map_sqlx)?;
        debug!(ops = ops.len(), "SQLite transaction committed");
        Ok(())
    }
}
