//! Read access to goals, opportunities and feedback for ranking.

use async_trait::async_trait;
use genie_core::{Feedback, Goal, Opportunity, OpportunityType};
use genie_db::NearestOpportunityRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::RankerError;

/// The queries ranking needs from the opportunity store.
#[async_trait]
pub trait OpportunityStore: Send + Sync {
    /// Load a goal, or `None` if it does not exist.
    async fn get_goal(&self, goal_id: Uuid) -> Result<Option<Goal>, RankerError>;

    /// Opportunities of `opportunity_type` whose cosine distance to
    /// `embedding` is below `max_distance`, nearest first, at most `limit`.
    ///
    /// Returns `(opportunity, distance)` pairs. Opportunities without an
    /// embedding never match.
    async fn nearest_opportunities(
        &self,
        opportunity_type: OpportunityType,
        embedding: &[f32],
        max_distance: f64,
        limit: usize,
    ) -> Result<Vec<(Opportunity, f64)>, RankerError>;

    /// Opportunities nearest to `embedding` across all types, or only
    /// `opportunity_type` when given, with no distance cutoff.
    ///
    /// Returns `(opportunity, distance)` pairs, nearest first, at most `limit`.
    async fn search_opportunities(
        &self,
        embedding: &[f32],
        opportunity_type: Option<OpportunityType>,
        limit: usize,
    ) -> Result<Vec<(Opportunity, f64)>, RankerError>;

    /// Every rating `user_id` left under `goal_id`.
    async fn list_feedback(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
    ) -> Result<Vec<Feedback>, RankerError>;
}

/// [`OpportunityStore`] over Postgres with pgvector.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OpportunityStore for PgStore {
    async fn get_goal(&self, goal_id: Uuid) -> Result<Option<Goal>, RankerError> {
        let Some(row) = genie_db::get_goal(&self.pool, goal_id).await? else {
            return Ok(None);
        };
        Ok(Some(Goal::try_from(row)?))
    }

    async fn nearest_opportunities(
        &self,
        opportunity_type: OpportunityType,
        embedding: &[f32],
        max_distance: f64,
        limit: usize,
    ) -> Result<Vec<(Opportunity, f64)>, RankerError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = genie_db::nearest_opportunities(
            &self.pool,
            opportunity_type,
            embedding,
            max_distance,
            limit,
        )
        .await?;
        Ok(decode_matches(rows))
    }

    async fn search_opportunities(
        &self,
        embedding: &[f32],
        opportunity_type: Option<OpportunityType>,
        limit: usize,
    ) -> Result<Vec<(Opportunity, f64)>, RankerError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows =
            genie_db::search_opportunities_by_embedding(&self.pool, embedding, opportunity_type, limit)
                .await?;
        Ok(decode_matches(rows))
    }

    async fn list_feedback(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
    ) -> Result<Vec<Feedback>, RankerError> {
        let rows = genie_db::list_feedback_for_goal(&self.pool, user_id, goal_id).await?;
        Ok(rows.into_iter().map(Feedback::from).collect())
    }
}

/// Decode `(row, distance)` pairs, skipping rows that fail to decode.
fn decode_matches(rows: Vec<NearestOpportunityRow>) -> Vec<(Opportunity, f64)> {
    let mut matches = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row.opportunity.id;
        match Opportunity::try_from(row.opportunity) {
            Ok(opportunity) => matches.push((opportunity, row.distance)),
            Err(e) => {
                tracing::warn!(opportunity_id = %id, error = %e, "skipping undecodable opportunity");
            }
        }
    }
    matches
}
