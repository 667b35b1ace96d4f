//! Relevance ranking, summaries and new-opportunity detection for one goal.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use genie_core::{
    AppConfig, Opportunity, OpportunityDigest, ScoredOpportunity, MAX_WINDOW_HOURS,
};
use uuid::Uuid;

use crate::error::RankerError;
use crate::feedback::{feedback_weights, DEFAULT_WEIGHT};
use crate::similarity::search_similar;
use crate::store::OpportunityStore;
use crate::summary::SummaryGenerator;

/// Returned by [`Ranker::summarize`] for an empty ranking.
pub const EMPTY_SUMMARY: &str = "No opportunities found matching your criteria.";

/// Tunables for [`Ranker`].
#[derive(Debug, Clone)]
pub struct RankerConfig {
    /// Minimum cosine similarity for a candidate, in `0.0..=1.0`.
    pub similarity_threshold: f64,
    /// Candidates fetched per requested result before re-ranking.
    pub oversample_factor: usize,
    /// Default number of results for [`Ranker::rank`] when the caller has no preference.
    pub default_limit: usize,
    /// How many top results go into a summary.
    pub summary_limit: usize,
    pub summary_timeout: Duration,
    /// Candidate cap for [`Ranker::find_new_since`].
    pub monitor_limit: usize,
    /// Search threshold for [`Ranker::find_new_since`], independent of
    /// `similarity_threshold`.
    pub monitor_threshold: f64,
    /// Similarity an opportunity must exceed to count as new and relevant.
    pub notify_threshold: f64,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            oversample_factor: 2,
            default_limit: 50,
            summary_limit: 10,
            summary_timeout: Duration::from_secs(60),
            monitor_limit: 100,
            monitor_threshold: 0.7,
            notify_threshold: 0.7,
        }
    }
}

impl RankerConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            similarity_threshold: config.relevance_threshold,
            default_limit: config.rank_default_limit,
            summary_timeout: Duration::from_secs(config.llm_timeout_secs),
            ..Self::default()
        }
    }
}

/// Scores a goal's candidates by similarity and the user's feedback.
///
/// Read-only over the store; safe to share behind an `Arc`.
pub struct Ranker {
    store: Arc<dyn OpportunityStore>,
    summarizer: Arc<dyn SummaryGenerator>,
    config: RankerConfig,
}

impl Ranker {
    #[must_use]
    pub fn new(
        store: Arc<dyn OpportunityStore>,
        summarizer: Arc<dyn SummaryGenerator>,
        config: RankerConfig,
    ) -> Self {
        Self {
            store,
            summarizer,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Rank the goal's candidates for `user_id`, best first, at most `limit`.
    ///
    /// 1. Fetch `oversample_factor * limit` candidates by similarity.
    /// 2. Look up the user's feedback for this goal.
    /// 3. Score each candidate as `similarity * feedback_weight`.
    /// 4. Sort descending (stable, so ties keep similarity order) and truncate.
    ///
    /// A missing goal, a goal without an embedding, or no candidates all
    /// produce an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`RankerError`] if the store fails. Store failures are never
    /// reported as an empty ranking.
    pub async fn rank(
        &self,
        goal_id: Uuid,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ScoredOpportunity>, RankerError> {
        let fetch = limit.saturating_mul(self.config.oversample_factor);
        let candidates = search_similar(
            self.store.as_ref(),
            goal_id,
            fetch,
            self.config.similarity_threshold,
        )
        .await?;

        if candidates.is_empty() {
            tracing::info!(goal_id = %goal_id, "no candidates to rank");
            return Ok(Vec::new());
        }

        let feedback = self.store.list_feedback(user_id, goal_id).await?;
        let weights = feedback_weights(&feedback);

        let mut ranked: Vec<ScoredOpportunity> = candidates
            .into_iter()
            .map(|(opportunity, similarity)| {
                let weight = weights
                    .get(&opportunity.id)
                    .copied()
                    .unwrap_or(DEFAULT_WEIGHT);
                ScoredOpportunity::new(opportunity, similarity, weight)
            })
            .collect();

        ranked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        ranked.truncate(limit);

        tracing::info!(
            goal_id = %goal_id,
            user_id = %user_id,
            ranked = ranked.len(),
            rated = weights.len(),
            "ranked opportunities"
        );
        Ok(ranked)
    }

    /// Natural-language summary of the top `limit` ranked opportunities.
    ///
    /// Never fails. An empty ranking returns [`EMPTY_SUMMARY`] without
    /// calling the generator; a generator error or timeout returns
    /// `"Found {N} relevant opportunities."` with `N = ranked.len()`.
    pub async fn summarize(&self, ranked: &[ScoredOpportunity], limit: usize) -> String {
        if ranked.is_empty() {
            return EMPTY_SUMMARY.to_string();
        }

        let digests: Vec<OpportunityDigest> = ranked
            .iter()
            .take(limit)
            .map(OpportunityDigest::from)
            .collect();

        let fallback = || format!("Found {} relevant opportunities.", ranked.len());

        match tokio::time::timeout(
            self.config.summary_timeout,
            self.summarizer.summarize(&digests),
        )
        .await
        {
            Ok(Ok(summary)) => summary,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "summary generation failed, using fallback");
                fallback()
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.config.summary_timeout.as_secs(),
                    "summary generation timed out, using fallback"
                );
                fallback()
            }
        }
    }

    /// Opportunities created within the last `window_hours` that are
    /// strongly similar to the goal.
    ///
    /// Both checks apply: `created_at` after the cutoff and similarity above
    /// the notify threshold. `window_hours` is clamped to
    /// `0..=MAX_WINDOW_HOURS`.
    ///
    /// # Errors
    ///
    /// Returns [`RankerError`] if the store fails.
    pub async fn find_new_since(
        &self,
        goal_id: Uuid,
        window_hours: i64,
    ) -> Result<Vec<Opportunity>, RankerError> {
        let cutoff = window_cutoff(window_hours);
        let candidates = search_similar(
            self.store.as_ref(),
            goal_id,
            self.config.monitor_limit,
            self.config.monitor_threshold,
        )
        .await?;

        let fresh: Vec<Opportunity> = candidates
            .into_iter()
            .filter(|(opportunity, similarity)| {
                opportunity.created_at > cutoff && *similarity > self.config.notify_threshold
            })
            .map(|(opportunity, _)| opportunity)
            .collect();

        tracing::debug!(
            goal_id = %goal_id,
            window_hours,
            new = fresh.len(),
            "checked for new opportunities"
        );
        Ok(fresh)
    }
}

/// Start of a look-back window ending now.
fn window_cutoff(window_hours: i64) -> DateTime<Utc> {
    let clamped = window_hours.clamp(0, MAX_WINDOW_HOURS);
    if clamped != window_hours {
        tracing::warn!(window_hours, clamped, "look-back window out of range, clamped");
    }
    chrono::Duration::try_hours(clamped)
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
#[path = "ranker_test.rs"]
mod tests;
