//! SQLite persistence via sqlx.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use sqlx::Row;
use tracing::info;

use crate::error::StoreError;
use crate::models::{EncryptedRecord, IdentityRecord};
use crate::store::Store;

/// Production store handle. Cheap to clone (pool is Arc internally).
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `db_path` and run pending
    /// migrations.
    ///
    /// WAL journal mode is configured at connection time, NOT inside a
    /// migration — SQLite forbids changing `journal_mode` inside a
    /// transaction and sqlx wraps every migration in one.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(opts).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        info!(path = %db_path.display(), "store opened");
        Ok(Self { pool })
    }
}

fn parse_expiry(text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("identity expiry: {e}")))
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_identity(&self, username: &str) -> Result<Option<IdentityRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT username, salt, wrapped_key, expires_at FROM identities WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let expires_at: String = row.try_get("expires_at")?;
            Ok(IdentityRecord {
                username: row.try_get("username")?,
                salt_hex: row.try_get("salt")?,
                wrapped_key_b64: row.try_get("wrapped_key")?,
                expires_at: parse_expiry(&expires_at)?,
            })
        })
        .transpose()
    }

    async fn put_identity(&self, identity: IdentityRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO identities (username, salt, wrapped_key, expires_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(username) DO UPDATE SET
                 salt = excluded.salt,
                 wrapped_key = excluded.wrapped_key,
                 expires_at = excluded.expires_at,
                 updated_at = datetime('now')",
        )
        .bind(&identity.username)
        .bind(&identity.salt_hex)
        .bind(&identity.wrapped_key_b64)
        .bind(identity.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_record(
        &self,
        username: &str,
        record_id: &str,
    ) -> Result<Option<EncryptedRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT username, record_id, blob FROM records WHERE username = ? AND record_id = ?",
        )
        .bind(username)
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(EncryptedRecord {
                username: row.try_get("username")?,
                record_id: row.try_get("record_id")?,
                blob_b64: row.try_get("blob")?,
            })
        })
        .transpose()
    }

    async fn put_record(&self, record: EncryptedRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO records (username, record_id, blob) VALUES (?, ?, ?)
             ON CONFLICT(username, record_id) DO UPDATE SET
                 blob = excluded.blob,
                 updated_at = datetime('now')",
        )
        .bind(&record.username)
        .bind(&record.record_id)
        .bind(&record.blob_b64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
