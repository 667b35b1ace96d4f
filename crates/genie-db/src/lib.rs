//! Postgres persistence for Genie: goals, opportunities (with pgvector
//! embeddings), feedback and scrape logs.
//!
//! Every query takes a `&PgPool` and returns plain row structs; conversion
//! into `genie_core` domain types happens through `TryFrom`/`From`.

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

pub mod feedback;
pub mod goals;
pub mod opportunities;
pub mod scrape_logs;

pub use feedback::{
    feedback_stats, insert_feedback, list_feedback_for_goal, FeedbackRow, FeedbackStats,
    NewFeedback,
};
pub use goals::{
    get_goal, insert_goal, list_active_goals, list_goals_for_user, update_goal_embedding,
    update_goal_status, GoalRow, NewGoal,
};
pub use opportunities::{
    count_opportunities, get_opportunity, insert_opportunity_if_absent, list_opportunities,
    nearest_opportunities, search_opportunities_by_embedding, NearestOpportunityRow,
    OpportunityRow,
};
pub use scrape_logs::{
    insert_scrape_log, list_recent_scrape_logs, NewScrapeLog, ScrapeLogRow, ScrapeStatus,
};

// Resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("could not decode {table} row {id}: {reason}")]
    Decode {
        table: &'static str,
        id: uuid::Uuid,
        reason: String,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Pool sizing, taken from `GENIE_DB_*` settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &genie_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

/// Open a connection pool.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Apply pending migrations and return how many ran.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    let before = applied_migrations(pool).await;
    MIGRATOR.run(pool).await?;
    let after = applied_migrations(pool).await;
    Ok(after.saturating_sub(before))
}

/// Successful migrations recorded so far; zero on a fresh database, where
/// `_sqlx_migrations` does not exist yet.
async fn applied_migrations(pool: &PgPool) -> usize {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
        .fetch_one(pool)
        .await
        .ok()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0)
}
