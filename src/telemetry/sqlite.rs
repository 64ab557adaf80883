//! SQLite telemetry source
//!
//! Reads the local mirror tables `llm_metrics` and `vllm_results` created by
//! the bundled migrations. Used for offline development and tests.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;

use super::{FetchError, TelemetrySource};
use crate::config::DatabaseConfig;
use crate::models::{ErrorEvent, MetricField, MetricSample};

pub struct SqliteSource {
    pool: SqlitePool,
}

impl SqliteSource {
    /// Open (or create) the database and run migrations
    ///
    /// An in-memory database lives only as long as its connection, so it
    /// gets a single connection that is never recycled.
    pub async fn connect(url: &str, cfg: &DatabaseConfig) -> Result<Self, FetchError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(cfg.connect_timeout_seconds));

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(cfg.max_connections)
                .idle_timeout(Duration::from_secs(cfg.idle_timeout_seconds))
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(cfg.connect_timeout_seconds))
            .connect_with(options)
            .await?;

        Self::from_pool(pool)
            .await
            .map_err(|e| FetchError::Database(format!("{:#}", e)))
    }

    /// Wrap an existing pool, running migrations first
    pub async fn from_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run telemetry mirror migrations")?;

        tracing::debug!("Telemetry mirror migrations completed");
        Ok(Self { pool })
    }

    /// Get the underlying connection pool (for seeding and tests)
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl TelemetrySource for SqliteSource {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn fetch_metrics(&self, limit: i64) -> Result<Vec<MetricSample>, FetchError> {
        let columns: Vec<String> = MetricField::ALL
            .iter()
            .map(|f| format!("CAST({col} AS REAL) AS {col}", col = f.as_str()))
            .collect();

        let sql = format!(
            "SELECT id, created_at, {}
             FROM llm_metrics
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
            columns.join(", ")
        );

        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?;

        rows.iter()
            .map(metric_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(FetchError::from)
    }

    async fn fetch_errors(&self, limit: i64) -> Result<Vec<ErrorEvent>, FetchError> {
        let rows = sqlx::query_as::<_, (i64, DateTime<Utc>, Option<String>)>(
            "SELECT id, created_at, error_message
             FROM vllm_results
             WHERE error = 1
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, created_at, message)| ErrorEvent::new(id, created_at, message))
            .collect())
    }

    async fn fetch_completed_requests(
        &self,
        limit: i64,
    ) -> Result<Vec<DateTime<Utc>>, FetchError> {
        let times = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT created_at
             FROM vllm_results
             WHERE error = 0
             ORDER BY created_at DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(times)
    }

    async fn count_completed_requests(&self) -> Result<i64, FetchError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vllm_results WHERE error = 0")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn ping(&self) -> Result<String, FetchError> {
        let now: String = sqlx::query_scalar("SELECT datetime('now')")
            .fetch_one(&self.pool)
            .await?;
        Ok(now)
    }
}

fn metric_from_row(row: &SqliteRow) -> Result<MetricSample, sqlx::Error> {
    let mut sample = MetricSample::new(row.try_get("created_at")?);
    sample.id = row.try_get("id")?;

    for field in MetricField::ALL {
        if let Some(value) = row.try_get::<Option<f64>, _>(field.as_str())? {
            sample.set_value(field, value);
        }
    }

    Ok(sample)
}
