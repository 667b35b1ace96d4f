//! Database operations for the `scrape_logs` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// Outcome of one scraper run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeStatus {
    Success,
    Failure,
    Partial,
}

impl ScrapeStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScrapeStatus::Success => "success",
            ScrapeStatus::Failure => "failure",
            ScrapeStatus::Partial => "partial",
        }
    }
}

/// A row from the `scrape_logs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapeLogRow {
    pub id: i64,
    pub source_name: String,
    pub status: String,
    pub opportunities_found: i32,
    pub error_log: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for [`insert_scrape_log`].
#[derive(Debug, Clone)]
pub struct NewScrapeLog<'a> {
    pub source_name: &'a str,
    pub status: ScrapeStatus,
    pub opportunities_found: i32,
    pub error_log: Option<&'a str>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Record a finished scraper run and return its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_scrape_log(pool: &PgPool, log: &NewScrapeLog<'_>) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO scrape_logs \
             (source_name, status, opportunities_found, error_log, started_at, completed_at) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id",
    )
    .bind(log.source_name)
    .bind(log.status.as_str())
    .bind(log.opportunities_found)
    .bind(log.error_log)
    .bind(log.started_at)
    .bind(log.completed_at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Most recent scraper runs, optionally for one source.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_scrape_logs(
    pool: &PgPool,
    source_name: Option<&str>,
    limit: i64,
) -> Result<Vec<ScrapeLogRow>, DbError> {
    let rows = sqlx::query_as::<_, ScrapeLogRow>(
        "SELECT id, source_name, status, opportunities_found, error_log, started_at, completed_at \
         FROM scrape_logs \
         WHERE ($1::text IS NULL OR source_name = $1) \
         ORDER BY started_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(source_name)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
