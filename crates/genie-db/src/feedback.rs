//! Database operations for the `feedback` table.

use chrono::{DateTime, Utc};
use genie_core::Feedback;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `feedback` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedbackRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub opportunity_id: Uuid,
    pub goal_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<FeedbackRow> for Feedback {
    fn from(row: FeedbackRow) -> Self {
        Feedback {
            id: row.id,
            user_id: row.user_id,
            opportunity_id: row.opportunity_id,
            goal_id: row.goal_id,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

/// Input for [`insert_feedback`].
#[derive(Debug, Clone)]
pub struct NewFeedback<'a> {
    pub user_id: Uuid,
    pub opportunity_id: Uuid,
    pub goal_id: Uuid,
    pub rating: i32,
    pub comment: Option<&'a str>,
}

/// Record a rating and return the stored row.
///
/// The table enforces `rating BETWEEN 1 AND 5`; out-of-range ratings are
/// rejected by the database.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including check and
/// foreign-key violations).
pub async fn insert_feedback(pool: &PgPool, feedback: &NewFeedback<'_>) -> Result<FeedbackRow, DbError> {
    let row = sqlx::query_as::<_, FeedbackRow>(
        "INSERT INTO feedback (id, user_id, opportunity_id, goal_id, rating, comment) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id, user_id, opportunity_id, goal_id, rating, comment, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(feedback.user_id)
    .bind(feedback.opportunity_id)
    .bind(feedback.goal_id)
    .bind(feedback.rating)
    .bind(feedback.comment)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// All feedback a user left for one goal, oldest first.
///
/// The ordering is part of the contract: folding the rows in order leaves
/// the most recent rating for each opportunity on top.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_feedback_for_goal(
    pool: &PgPool,
    user_id: Uuid,
    goal_id: Uuid,
) -> Result<Vec<FeedbackRow>, DbError> {
    let rows = sqlx::query_as::<_, FeedbackRow>(
        "SELECT id, user_id, opportunity_id, goal_id, rating, comment, created_at \
         FROM feedback \
         WHERE user_id = $1 AND goal_id = $2 \
         ORDER BY created_at, id",
    )
    .bind(user_id)
    .bind(goal_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Aggregate of a user's ratings.
#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct FeedbackStats {
    /// Mean rating, `0.0` when there is no feedback.
    pub average_rating: f64,
    pub total_feedback: i64,
}

/// Average rating and count of a user's feedback, optionally for one goal.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn feedback_stats(
    pool: &PgPool,
    user_id: Uuid,
    goal_id: Option<Uuid>,
) -> Result<FeedbackStats, DbError> {
    let stats = sqlx::query_as::<_, FeedbackStats>(
        "SELECT COALESCE(AVG(rating), 0)::float8 AS average_rating, \
                COUNT(*) AS total_feedback \
         FROM feedback \
         WHERE user_id = $1 AND ($2::uuid IS NULL OR goal_id = $2)",
    )
    .bind(user_id)
    .bind(goal_id)
    .fetch_one(pool)
    .await?;

    Ok(stats)
}
