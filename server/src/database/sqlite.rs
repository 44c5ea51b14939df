use std::str::FromStr;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use shared::types::{SessionKey, SessionRecord};

use crate::database::store::{SessionStore, StoreError};

/// Session store backed by a single SQLite table.
///
/// The table name comes from `store.namespace`, which config validation has
/// already restricted to `[A-Za-z0-9_]`.
#[derive(Clone, Debug)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
    table: String,
}

impl SqliteSessionStore {
    /// Open (creating if needed) the database at `address` and make sure the
    /// session table exists.
    pub async fn connect(address: &str, table: &str) -> Result<Self, StoreError> {
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(StoreError::Backend(format!(
                "invalid session table name '{}'",
                table
            )));
        }

        let options = SqliteConnectOptions::from_str(address)?.create_if_missing(true);

        // An in-memory database exists per connection, so keep exactly one.
        let max_connections = if address.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            table: table.to_string(),
        };
        store.create_table().await?;

        info!("SQLite session store ready: {} (table '{}')", address, table);
        Ok(store)
    }

    async fn create_table(&self) -> Result<(), StoreError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                session_key TEXT PRIMARY KEY NOT NULL,
                payload     TEXT NOT NULL,
                user_agent  TEXT NOT NULL,
                created_at  INTEGER NOT NULL
            )",
            self.table
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Remove every session of `subject` (logout everywhere).
    ///
    /// Keys are `subject:signature` and a base64url signature never contains
    /// `:`, so a key belongs to `subject` iff it starts with `subject:` and
    /// has no further `:`. Lengths are compared in characters on both sides.
    pub async fn delete_subject(&self, subject: &str) -> Result<u64, StoreError> {
        let sql = format!(
            "DELETE FROM {} \
             WHERE substr(session_key, 1, length(?1)) = ?1 \
               AND instr(substr(session_key, length(?1) + 1), ':') = 0",
            self.table
        );
        let prefix = format!("{}:", subject);
        let result = sqlx::query(&sql).bind(&prefix).execute(&self.pool).await?;

        debug!("Deleted {} session(s) for {}", result.rows_affected(), subject);
        Ok(result.rows_affected())
    }

    /// Drop sessions created before `cutoff` (Unix seconds).
    pub async fn cleanup_created_before(&self, cutoff: i64) -> Result<u64, StoreError> {
        let sql = format!("DELETE FROM {} WHERE created_at < ?1", self.table);
        let result = sqlx::query(&sql).bind(cutoff).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn put(&self, key: &SessionKey, record: &SessionRecord) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {} (session_key, payload, user_agent, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(session_key) DO UPDATE SET
                payload = excluded.payload,
                user_agent = excluded.user_agent,
                created_at = excluded.created_at",
            self.table
        );

        sqlx::query(&sql)
            .bind(key.as_str())
            .bind(&record.payload)
            .bind(&record.user_agent)
            .bind(record.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &SessionKey) -> Result<SessionRecord, StoreError> {
        let sql = format!(
            "SELECT payload, user_agent, created_at FROM {} WHERE session_key = ?1",
            self.table
        );

        let row = sqlx::query(&sql)
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;

        Ok(SessionRecord {
            payload: row.try_get("payload")?,
            user_agent: row.try_get("user_agent")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE session_key = ?1", self.table);

        let result = sqlx::query(&sql)
            .bind(key.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
