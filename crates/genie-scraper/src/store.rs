//! Write access used by ingestion and goal intake.

use async_trait::async_trait;
use genie_core::{Goal, RawOpportunity};
use genie_db::{DbError, NewGoal, NewScrapeLog};
use sqlx::PgPool;

/// The writes ingestion needs from the store.
#[async_trait]
pub trait IngestStore: Send + Sync {
    async fn record_scrape(&self, log: &NewScrapeLog<'_>) -> Result<(), DbError>;

    /// Store an opportunity unless its `source_url` is already present.
    ///
    /// Returns `true` if a new row was written.
    async fn insert_opportunity(
        &self,
        raw: &RawOpportunity,
        embedding: Option<&[f32]>,
    ) -> Result<bool, DbError>;

    async fn insert_goal(&self, goal: &NewGoal<'_>) -> Result<Goal, DbError>;
}

/// [`IngestStore`] over Postgres.
#[derive(Clone)]
pub struct PgIngestStore {
    pool: PgPool,
}

impl PgIngestStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IngestStore for PgIngestStore {
    async fn record_scrape(&self, log: &NewScrapeLog<'_>) -> Result<(), DbError> {
        genie_db::insert_scrape_log(&self.pool, log).await?;
        Ok(())
    }

    async fn insert_opportunity(
        &self,
        raw: &RawOpportunity,
        embedding: Option<&[f32]>,
    ) -> Result<bool, DbError> {
        let id = genie_db::insert_opportunity_if_absent(&self.pool, raw, embedding).await?;
        Ok(id.is_some())
    }

    async fn insert_goal(&self, goal: &NewGoal<'_>) -> Result<Goal, DbError> {
        let row = genie_db::insert_goal(&self.pool, goal).await?;
        Goal::try_from(row)
    }
}
