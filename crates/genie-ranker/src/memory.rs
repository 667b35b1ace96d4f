//! In-process [`OpportunityStore`] that computes cosine distance in Rust.
//!
//! Follows the same contract as the Postgres store: type is a hard filter,
//! rows without an embedding never match, and results are ordered by
//! ascending distance with ties broken by id.

use std::collections::HashMap;

use async_trait::async_trait;
use genie_core::{Feedback, Goal, Opportunity, OpportunityType};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::RankerError;
use crate::store::OpportunityStore;

/// Cosine distance (`1 - cos θ`) between two vectors.
///
/// Returns `None` when the lengths differ or either vector has zero norm.
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a <= 0.0 || norm_b <= 0.0 {
        return None;
    }
    Some(1.0 - dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Ascending distance, ties by id, at most `limit`.
fn nearest_first(mut matches: Vec<(Opportunity, f64)>, limit: usize) -> Vec<(Opportunity, f64)> {
    matches.sort_by(|(a, da), (b, db)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)));
    matches.truncate(limit);
    matches
}

#[derive(Default)]
struct Tables {
    goals: HashMap<Uuid, Goal>,
    opportunities: Vec<Opportunity>,
    feedback: Vec<Feedback>,
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_goal(&self, goal: Goal) {
        self.tables.write().await.goals.insert(goal.id, goal);
    }

    /// Add an opportunity unless one with the same `source_url` exists.
    ///
    /// Returns `true` if it was stored.
    pub async fn insert_opportunity(&self, opportunity: Opportunity) -> bool {
        let mut tables = self.tables.write().await;
        if tables
            .opportunities
            .iter()
            .any(|o| o.source_url == opportunity.source_url)
        {
            return false;
        }
        tables.opportunities.push(opportunity);
        true
    }

    pub async fn add_feedback(&self, feedback: Feedback) {
        self.tables.write().await.feedback.push(feedback);
    }
}

#[async_trait]
impl OpportunityStore for MemoryStore {
    async fn get_goal(&self, goal_id: Uuid) -> Result<Option<Goal>, RankerError> {
        Ok(self.tables.read().await.goals.get(&goal_id).cloned())
    }

    async fn nearest_opportunities(
        &self,
        opportunity_type: OpportunityType,
        embedding: &[f32],
        max_distance: f64,
        limit: usize,
    ) -> Result<Vec<(Opportunity, f64)>, RankerError> {
        let tables = self.tables.read().await;
        let matches: Vec<(Opportunity, f64)> = tables
            .opportunities
            .iter()
            .filter(|o| o.opportunity_type == opportunity_type)
            .filter_map(|o| {
                let distance = cosine_distance(o.embedding.as_deref()?, embedding)?;
                (distance < max_distance).then(|| (o.clone(), distance))
            })
            .collect();

        Ok(nearest_first(matches, limit))
    }

    async fn search_opportunities(
        &self,
        embedding: &[f32],
        opportunity_type: Option<OpportunityType>,
        limit: usize,
    ) -> Result<Vec<(Opportunity, f64)>, RankerError> {
        let tables = self.tables.read().await;
        let matches: Vec<(Opportunity, f64)> = tables
            .opportunities
            .iter()
            .filter(|o| opportunity_type.is_none_or(|kind| o.opportunity_type == kind))
            .filter_map(|o| {
                let distance = cosine_distance(o.embedding.as_deref()?, embedding)?;
                Some((o.clone(), distance))
            })
            .collect();

        Ok(nearest_first(matches, limit))
    }

    async fn list_feedback(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
    ) -> Result<Vec<Feedback>, RankerError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Feedback> = tables
            .feedback
            .iter()
            .filter(|f| f.user_id == user_id && f.goal_id == goal_id)
            .cloned()
            .collect();
        rows.sort_by_key(|f| (f.created_at, f.id));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_distance_of_identical_vectors_is_zero() {
        let d = cosine_distance(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn cosine_distance_of_orthogonal_vectors_is_one() {
        let d = cosine_distance(&[1.0, 0.0], &[0.0, 5.0]).unwrap();
        assert!((d - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_distance_ignores_magnitude() {
        let d = cosine_distance(&[1.0, 1.0], &[3.0, 3.0]).unwrap();
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn cosine_distance_rejects_mismatched_or_zero_vectors() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0]).is_none());
        assert!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]).is_none());
        assert!(cosine_distance(&[], &[]).is_none());
    }
}
