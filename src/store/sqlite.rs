//! SQLite-backed quote store

use crate::core::error::StoreError;
use crate::core::quote::{Quote, QuoteRecord, QuoteStore};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

/// DDL for the append-only quotes table.
pub const CREATE_QUOTES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS cotacoes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bid TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )
"#;

pub struct SqliteQuoteStore {
    pool: SqlitePool,
}

impl SqliteQuoteStore {
    /// Opens (or creates) the database file and makes sure the table exists.
    pub async fn open<P: AsRef<Path>>(path: P, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_QUOTES_TABLE).execute(&pool).await?;
        info!("Opened quote store at {}", path.as_ref().display());

        Ok(Self { pool })
    }

    /// Most recent records first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<QuoteRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, bid, created_at
            FROM cotacoes
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<QuoteRecord, StoreError> {
                let created_at: NaiveDateTime = row.try_get("created_at")?;
                Ok(QuoteRecord {
                    id: row.try_get("id")?,
                    bid: row.try_get("bid")?,
                    created_at: created_at.and_utc(),
                })
            })
            .collect()
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cotacoes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl QuoteStore for SqliteQuoteStore {
    async fn insert(&self, quote: &Quote) -> Result<i64, StoreError> {
        let result = sqlx::query("INSERT INTO cotacoes (bid) VALUES (?)")
            .bind(quote.bid())
            .execute(&self.pool)
            .await?;

        let id = result.last_insert_rowid();
        debug!(id, bid = %quote.bid(), "Stored quote");
        Ok(id)
    }

    async fn close(&self) {
        self.pool.close().await;
        debug!("Quote store closed");
    }
}
