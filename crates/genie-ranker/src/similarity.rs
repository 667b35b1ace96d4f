//! Similarity search: a goal's embedding, or a free-text query, against
//! stored opportunities.

use genie_core::{Opportunity, OpportunityType};
use genie_llm::Embedder;
use uuid::Uuid;

use crate::error::RankerError;
use crate::store::OpportunityStore;

/// Opportunities of the goal's type with cosine similarity above `threshold`,
/// most similar first, at most `limit`.
///
/// Returns `(opportunity, similarity)` pairs where `similarity = 1 - distance`.
/// A missing goal or a goal without an embedding yields an empty list.
///
/// # Errors
///
/// Returns [`RankerError`] if the store fails.
pub async fn search_similar(
    store: &dyn OpportunityStore,
    goal_id: Uuid,
    limit: usize,
    threshold: f64,
) -> Result<Vec<(Opportunity, f64)>, RankerError> {
    let Some(goal) = store.get_goal(goal_id).await? else {
        tracing::debug!(goal_id = %goal_id, "goal not found, no candidates");
        return Ok(Vec::new());
    };
    let Some(embedding) = goal.embedding.as_deref() else {
        tracing::debug!(goal_id = %goal_id, "goal has no embedding, no candidates");
        return Ok(Vec::new());
    };
    if limit == 0 {
        return Ok(Vec::new());
    }

    let matches = store
        .nearest_opportunities(goal.goal_type, embedding, 1.0 - threshold, limit)
        .await?;

    Ok(matches
        .into_iter()
        .map(|(opportunity, distance)| (opportunity, 1.0 - distance))
        .collect())
}

/// Free-text semantic search: embed `query` and return the nearest
/// opportunities, optionally of one type, as `(opportunity, similarity)`
/// pairs, most similar first.
///
/// No similarity threshold applies. A blank query or zero limit yields an
/// empty list without calling the embedder.
///
/// # Errors
///
/// Returns [`RankerError::Llm`] if the query cannot be embedded, or any
/// store error.
pub async fn search_by_text(
    store: &dyn OpportunityStore,
    embedder: &dyn Embedder,
    query: &str,
    opportunity_type: Option<OpportunityType>,
    limit: usize,
) -> Result<Vec<(Opportunity, f64)>, RankerError> {
    let query = query.trim();
    if query.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let embedding = embedder.embed(query).await?;
    let matches = store
        .search_opportunities(&embedding, opportunity_type, limit)
        .await?;

    tracing::debug!(results = matches.len(), "text search");
    Ok(matches
        .into_iter()
        .map(|(opportunity, distance)| (opportunity, 1.0 - distance))
        .collect())
}
