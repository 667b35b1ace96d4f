//! Feedback weight policy.
//!
//! A user's 1–5 rating of an opportunity becomes a flat multiplier on its
//! similarity score. When the same opportunity is rated more than once for a
//! goal, the most recent rating wins.

use std::collections::HashMap;

use genie_core::Feedback;
use uuid::Uuid;

/// Weight applied when the user has not rated an opportunity.
pub const DEFAULT_WEIGHT: f64 = 1.0;
/// Weight for ratings of 4 or 5.
pub const BOOST_WEIGHT: f64 = 1.2;
/// Weight for ratings of 1 or 2.
pub const PENALTY_WEIGHT: f64 = 0.5;

/// How a rating moves an opportunity in the ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackSignal {
    Boost,
    Neutral,
    Penalty,
}

impl FeedbackSignal {
    #[must_use]
    pub fn from_rating(rating: i32) -> Self {
        if rating >= 4 {
            FeedbackSignal::Boost
        } else if rating <= 2 {
            FeedbackSignal::Penalty
        } else {
            FeedbackSignal::Neutral
        }
    }

    #[must_use]
    pub fn weight(self) -> f64 {
        match self {
            FeedbackSignal::Boost => BOOST_WEIGHT,
            FeedbackSignal::Neutral => DEFAULT_WEIGHT,
            FeedbackSignal::Penalty => PENALTY_WEIGHT,
        }
    }
}

/// Multiplier for a single rating.
#[must_use]
pub fn feedback_weight(rating: i32) -> f64 {
    FeedbackSignal::from_rating(rating).weight()
}

/// Build the per-opportunity weight map for one (user, goal) pair.
///
/// Rows are folded oldest first (`created_at`, then `id`), so a later rating
/// replaces an earlier one. Rows with a rating outside 1..=5 are skipped.
#[must_use]
pub fn feedback_weights(feedback: &[Feedback]) -> HashMap<Uuid, f64> {
    let mut ordered: Vec<&Feedback> = feedback.iter().collect();
    ordered.sort_by_key(|f| (f.created_at, f.id));

    let mut weights = HashMap::with_capacity(ordered.len());
    for f in ordered {
        if !f.has_valid_rating() {
            tracing::warn!(
                feedback_id = %f.id,
                opportunity_id = %f.opportunity_id,
                rating = f.rating,
                "skipping feedback with out-of-range rating"
            );
            continue;
        }
        weights.insert(f.opportunity_id, feedback_weight(f.rating));
    }
    weights
}
