//! Database operations for the `goals` table.

use chrono::{DateTime, Utc};
use genie_core::{Goal, GoalFilters, GoalStatus, OpportunityType};
use pgvector::Vector;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `goals` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GoalRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: String,
    pub goal_type: String,
    pub filters: Value,
    pub embedding: Option<Vector>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<GoalRow> for Goal {
    type Error = DbError;

    fn try_from(row: GoalRow) -> Result<Self, Self::Error> {
        let decode = |reason: String| DbError::Decode {
            table: "goals",
            id: row.id,
            reason,
        };

        let goal_type = row
            .goal_type
            .parse::<OpportunityType>()
            .map_err(|e| decode(e.to_string()))?;
        let status = row
            .status
            .parse::<GoalStatus>()
            .map_err(|e| decode(e.to_string()))?;
        let filters: GoalFilters =
            serde_json::from_value(row.filters.clone()).map_err(|e| decode(e.to_string()))?;

        Ok(Goal {
            id: row.id,
            user_id: row.user_id,
            description: row.description,
            goal_type,
            filters,
            embedding: row.embedding.map(|v| v.to_vec()),
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Input for [`insert_goal`].
#[derive(Debug, Clone)]
pub struct NewGoal<'a> {
    pub user_id: Uuid,
    pub description: &'a str,
    pub goal_type: OpportunityType,
    pub filters: &'a GoalFilters,
    pub embedding: Option<&'a [f32]>,
}

const GOAL_COLUMNS: &str =
    "id, user_id, description, goal_type, filters, embedding, status, created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert a new goal in `active` status and return the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_goal(pool: &PgPool, goal: &NewGoal<'_>) -> Result<GoalRow, DbError> {
    let filters = serde_json::to_value(goal.filters).map_err(|e| DbError::Decode {
        table: "goals",
        id: Uuid::nil(),
        reason: e.to_string(),
    })?;

    let row = sqlx::query_as::<_, GoalRow>(&format!(
        "INSERT INTO goals (id, user_id, description, goal_type, filters, embedding, status) \
         VALUES ($1, $2, $3, $4, $5, $6, 'active') \
         RETURNING {GOAL_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(goal.user_id)
    .bind(goal.description)
    .bind(goal.goal_type.as_str())
    .bind(filters)
    .bind(goal.embedding.map(|e| Vector::from(e.to_vec())))
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Return a goal by id, or `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_goal(pool: &PgPool, id: Uuid) -> Result<Option<GoalRow>, DbError> {
    let row = sqlx::query_as::<_, GoalRow>(&format!(
        "SELECT {GOAL_COLUMNS} FROM goals WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Return every goal in `active` status, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_goals(pool: &PgPool) -> Result<Vec<GoalRow>, DbError> {
    let rows = sqlx::query_as::<_, GoalRow>(&format!(
        "SELECT {GOAL_COLUMNS} FROM goals \
         WHERE status = 'active' \
         ORDER BY created_at, id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Return all goals owned by a user, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_goals_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<GoalRow>, DbError> {
    let rows = sqlx::query_as::<_, GoalRow>(&format!(
        "SELECT {GOAL_COLUMNS} FROM goals \
         WHERE user_id = $1 \
         ORDER BY created_at DESC, id"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Set a goal's status and bump `updated_at`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no goal has this id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_goal_status(
    pool: &PgPool,
    id: Uuid,
    status: GoalStatus,
) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE goals SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Replace a goal's embedding (and filters) after re-clarification.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no goal has this id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_goal_embedding(
    pool: &PgPool,
    id: Uuid,
    filters: &GoalFilters,
    embedding: &[f32],
) -> Result<(), DbError> {
    let filters = serde_json::to_value(filters).map_err(|e| DbError::Decode {
        table: "goals",
        id,
        reason: e.to_string(),
    })?;

    let result = sqlx::query(
        "UPDATE goals SET filters = $1, embedding = $2, updated_at = NOW() WHERE id = $3",
    )
    .bind(filters)
    .bind(Vector::from(embedding.to_vec()))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
