use anyhow::{Context, Result};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

/// Shared connection pool with the forecast archive schema applied
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        if db_url.contains(":memory:") {
            return Self::in_memory().await;
        }

        // Ensure the directory exists if it's a file path
        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            let path = Path::new(path_part);
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create database directory")?;
            }
        }

        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal); // Better for concurrency

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        info!("Connected to database: {}", db_url);

        let db = Self { pool };
        db.init().await?;

        Ok(db)
    }

    /// Private in-memory database. Limited to one connection, since every
    /// SQLite connection would otherwise open its own empty database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory SQLite database")?;

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    /// Cheap liveness probe
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        // 1. Prediction Requests Table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS prediction_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                request_id TEXT NOT NULL UNIQUE,
                species TEXT NOT NULL,
                province TEXT NOT NULL,
                city TEXT NOT NULL,
                date_from DATE NOT NULL,
                date_to DATE NOT NULL,
                created_at DATETIME NOT NULL,
                ip_address TEXT,
                user_agent TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_requests_location
            ON prediction_requests (species, province, city);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create prediction_requests table")?;

        // 2. Predictions Table (values stored as 2-dp decimal text)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                request_id TEXT NOT NULL
                    REFERENCES prediction_requests (request_id) ON DELETE CASCADE,
                prediction_date DATE NOT NULL,
                predicted_value TEXT NOT NULL,
                confidence_lower TEXT,
                confidence_upper TEXT,
                created_at DATETIME NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_predictions_request
            ON predictions (request_id);
            CREATE INDEX IF NOT EXISTS idx_predictions_date
            ON predictions (prediction_date);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create predictions table")?;

        info!("Database schema initialized.");
        Ok(())
    }
}
