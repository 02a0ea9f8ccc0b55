//! Ledger of the tags this engine last applied to each document, keyed by
//! vault-relative path, together with the settings fingerprint they were
//! derived under.

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("corrupt ledger entry: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTags {
    pub tags: Vec<String>,
    pub fingerprint: String,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects and runs migrations.
    pub async fn open(database_url: &str) -> anyhow::Result<Self> {
        let pool = crate::connect(database_url).await?;
        crate::migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn get(&self, path: &str) -> Result<Option<AppliedTags>, LedgerError> {
        let row = sqlx::query("SELECT tags_json, fingerprint FROM applied_tags WHERE path = ?1")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let tags_json: String = row.get(0);
                Ok(Some(AppliedTags {
                    tags: serde_json::from_str(&tags_json)?,
                    fingerprint: row.get(1),
                }))
            }
            None => Ok(None),
        }
    }

    pub async fn record(
        &self,
        path: &str,
        tags: &[String],
        fingerprint: &str,
    ) -> Result<(), LedgerError> {
        let tags_json = serde_json::to_string(tags)?;
        sqlx::query(
            r#"
            INSERT INTO applied_tags (path, tags_json, fingerprint, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(path) DO UPDATE SET
                tags_json = excluded.tags_json,
                fingerprint = excluded.fingerprint,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(path)
        .bind(tags_json)
        .bind(fingerprint)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Re-keys an entry after its document moved. Any entry already stored
    /// under `to` is replaced.
    pub async fn rename(&self, from: &str, to: &str) -> Result<(), LedgerError> {
        if from == to {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM applied_tags WHERE path = ?1")
            .bind(to)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE applied_tags SET path = ?2 WHERE path = ?1")
            .bind(from)
            .bind(to)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn forget(&self, path: &str) -> Result<(), LedgerError> {
        sqlx::query("DELETE FROM applied_tags WHERE path = ?1")
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<u64, LedgerError> {
        let res = sqlx::query("DELETE FROM applied_tags")
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    pub async fn len(&self) -> Result<i64, LedgerError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM applied_tags")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
