//! PostgreSQL telemetry source

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;

use super::{FetchError, TelemetrySource};
use crate::config::DatabaseConfig;
use crate::models::{ErrorEvent, MetricField, MetricSample};

pub struct PostgresSource {
    pool: PgPool,
    metrics_table: String,
    results_table: String,
}

impl PostgresSource {
    /// Create the pool; connections are opened lazily on first query
    pub async fn connect(url: &str, cfg: &DatabaseConfig) -> Result<Self, FetchError> {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .idle_timeout(Duration::from_secs(cfg.idle_timeout_seconds))
            .acquire_timeout(Duration::from_secs(cfg.connect_timeout_seconds))
            .connect_lazy(url)?;

        Ok(Self::from_pool(pool, cfg))
    }

    pub fn from_pool(pool: PgPool, cfg: &DatabaseConfig) -> Self {
        Self {
            pool,
            metrics_table: qualified_table(&cfg.schema, &cfg.metrics_table),
            results_table: qualified_table(&cfg.schema, &cfg.results_table),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TelemetrySource for PostgresSource {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn fetch_metrics(&self, limit: i64) -> Result<Vec<MetricSample>, FetchError> {
        let sql = metrics_query(&self.metrics_table);
        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?;

        rows.iter()
            .map(metric_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(FetchError::from)
    }

    async fn fetch_errors(&self, limit: i64) -> Result<Vec<ErrorEvent>, FetchError> {
        let sql = format!(
            "SELECT CAST(id AS BIGINT) AS id,
                    CAST(created_at AS TIMESTAMPTZ) AS created_at,
                    error_message
             FROM {}
             WHERE error = true
             ORDER BY created_at DESC
             LIMIT $1",
            self.results_table
        );

        let rows = sqlx::query_as::<_, (i64, DateTime<Utc>, Option<String>)>(&sql)
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
        let sql = format!(
            "SELECT CAST(created_at AS TIMESTAMPTZ) AS created_at
             FROM {}
             WHERE error = false
             ORDER BY created_at DESC
             LIMIT $1",
            self.results_table
        );

        let times = sqlx::query_scalar::<_, DateTime<Utc>>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(times)
    }

    async fn count_completed_requests(&self) -> Result<i64, FetchError> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE error = false", self.results_table);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn ping(&self) -> Result<String, FetchError> {
        let now: String = sqlx::query_scalar("SELECT CAST(NOW() AS TEXT)")
            .fetch_one(&self.pool)
            .await?;
        Ok(now)
    }
}

/// Numeric columns may be stored as text or integers; cast them server side
fn metrics_query(table: &str) -> String {
    let columns: Vec<String> = MetricField::ALL
        .iter()
        .map(|f| format!("CAST({col} AS DOUBLE PRECISION) AS {col}", col = f.as_str()))
        .collect();

    format!(
        "SELECT CAST(id AS BIGINT) AS id,
                CAST(created_at AS TIMESTAMPTZ) AS created_at,
                {}
         FROM {}
         ORDER BY created_at DESC
         LIMIT $1",
        columns.join(",\n                "),
        table
    )
}

fn metric_from_row(row: &PgRow) -> Result<MetricSample, sqlx::Error> {
    let mut sample = MetricSample::new(row.try_get("created_at")?);
    sample.id = row.try_get("id")?;

    for field in MetricField::ALL {
        if let Some(value) = row.try_get::<Option<f64>, _>(field.as_str())? {
            sample.set_value(field, value);
        }
    }

    Ok(sample)
}

/// `"schema"."table"` with embedded quotes doubled
fn qualified_table(schema: &str, table: &str) -> String {
    if schema.is_empty() {
        quote_ident(table)
    } else {
        format!("{}.{}", quote_ident(schema), quote_ident(table))
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
