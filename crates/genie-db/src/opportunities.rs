//! Database operations for the `opportunities` table.
//!
//! `source_url` is the dedup key: inserts use `ON CONFLICT (source_url) DO
//! NOTHING`, so the store never holds two rows for the same URL.

use chrono::{DateTime, Utc};
use genie_core::{Compensation, Opportunity, OpportunityType, RawOpportunity};
use pgvector::Vector;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `opportunities` table (without `raw_data`).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OpportunityRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub source_url: String,
    pub source_name: String,
    pub opportunity_type: String,
    pub location: Option<String>,
    pub remote: bool,
    pub compensation: Option<Value>,
    pub tags: Vec<String>,
    pub embedding: Option<Vector>,
    pub scraped_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// An opportunity row paired with its cosine distance to a query vector.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NearestOpportunityRow {
    #[sqlx(flatten)]
    pub opportunity: OpportunityRow,
    pub distance: f64,
}

impl TryFrom<OpportunityRow> for Opportunity {
    type Error = DbError;

    fn try_from(row: OpportunityRow) -> Result<Self, Self::Error> {
        let opportunity_type =
            row.opportunity_type
                .parse::<OpportunityType>()
                .map_err(|e| DbError::Decode {
                    table: "opportunities",
                    id: row.id,
                    reason: e.to_string(),
                })?;

        Ok(Opportunity {
            id: row.id,
            title: row.title,
            description: row.description,
            source_url: row.source_url,
            source_name: row.source_name,
            opportunity_type,
            location: row.location,
            remote: row.remote,
            compensation: row.compensation.and_then(Compensation::from_value),
            tags: row.tags,
            embedding: row.embedding.map(|v| v.to_vec()),
            scraped_at: row.scraped_at,
            created_at: row.created_at,
        })
    }
}

const OPPORTUNITY_COLUMNS: &str = "id, title, description, source_url, source_name, \
     opportunity_type, location, remote, compensation, tags, embedding, scraped_at, created_at";

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Insert a scraped opportunity unless one with the same `source_url` exists.
///
/// Returns `Some(id)` for a newly stored row and `None` when the URL was
/// already present.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_opportunity_if_absent(
    pool: &PgPool,
    raw: &RawOpportunity,
    embedding: Option<&[f32]>,
) -> Result<Option<Uuid>, DbError> {
    let compensation = raw
        .compensation
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| DbError::Decode {
            table: "opportunities",
            id: Uuid::nil(),
            reason: e.to_string(),
        })?;

    let id: Option<Uuid> = sqlx::query_scalar(
        "INSERT INTO opportunities \
             (id, title, description, source_url, source_name, opportunity_type, \
              location, remote, compensation, tags, embedding, raw_data) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         ON CONFLICT (source_url) DO NOTHING \
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(&raw.title)
    .bind(raw.description.as_deref())
    .bind(&raw.source_url)
    .bind(&raw.source_name)
    .bind(raw.opportunity_type.as_str())
    .bind(raw.location.as_deref())
    .bind(raw.remote)
    .bind(compensation)
    .bind(&raw.tags)
    .bind(embedding.map(|e| Vector::from(e.to_vec())))
    .bind(&raw.raw_data)
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Return an opportunity by id, or `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_opportunity(pool: &PgPool, id: Uuid) -> Result<Option<OpportunityRow>, DbError> {
    let row = sqlx::query_as::<_, OpportunityRow>(&format!(
        "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// List opportunities newest first, optionally restricted to one type.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_opportunities(
    pool: &PgPool,
    opportunity_type: Option<OpportunityType>,
    limit: i64,
    offset: i64,
) -> Result<Vec<OpportunityRow>, DbError> {
    let rows = sqlx::query_as::<_, OpportunityRow>(&format!(
        "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities \
         WHERE ($1::text IS NULL OR opportunity_type = $1) \
         ORDER BY created_at DESC, id \
         LIMIT $2 OFFSET $3"
    ))
    .bind(opportunity_type.map(OpportunityType::as_str))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Count stored opportunities.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_opportunities(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM opportunities")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Nearest opportunities of `opportunity_type` by cosine distance.
///
/// Only rows with an embedding and `distance < max_distance` are returned,
/// ordered by ascending distance (ties broken by id for a stable order), at
/// most `limit` rows. Type is a hard filter.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn nearest_opportunities(
    pool: &PgPool,
    opportunity_type: OpportunityType,
    embedding: &[f32],
    max_distance: f64,
    limit: i64,
) -> Result<Vec<NearestOpportunityRow>, DbError> {
    let rows = sqlx::query_as::<_, NearestOpportunityRow>(&format!(
        "SELECT {OPPORTUNITY_COLUMNS}, (embedding <=> $1)::float8 AS distance \
         FROM opportunities \
         WHERE opportunity_type = $2 \
           AND embedding IS NOT NULL \
           AND (embedding <=> $1) < $3 \
         ORDER BY distance, id \
         LIMIT $4"
    ))
    .bind(Vector::from(embedding.to_vec()))
    .bind(opportunity_type.as_str())
    .bind(max_distance)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Opportunities nearest to a free-text query embedding, any type unless
/// `opportunity_type` is given.
///
/// No distance cutoff applies; rows without an embedding are skipped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn search_opportunities_by_embedding(
    pool: &PgPool,
    embedding: &[f32],
    opportunity_type: Option<OpportunityType>,
    limit: i64,
) -> Result<Vec<NearestOpportunityRow>, DbError> {
    let rows = sqlx::query_as::<_, NearestOpportunityRow>(&format!(
        "SELECT {OPPORTUNITY_COLUMNS}, (embedding <=> $1)::float8 AS distance \
         FROM opportunities \
         WHERE embedding IS NOT NULL \
           AND ($2::text IS NULL OR opportunity_type = $2) \
         ORDER BY distance, id \
         LIMIT $3"
    ))
    .bind(Vector::from(embedding.to_vec()))
    .bind(opportunity_type.map(OpportunityType::as_str))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
