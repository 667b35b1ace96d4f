//! Goal intake: clarify a description, store the goal, and search for it.

use std::sync::Arc;

use genie_core::{ClarifiedGoal, Goal};
use genie_db::NewGoal;
use genie_llm::{Embedder, GoalClarifier};
use serde::Serialize;
use uuid::Uuid;

use crate::error::IngestError;
use crate::executor::{Executor, IngestReport};
use crate::store::IngestStore;

/// A stored goal and the ingestion run it triggered.
#[derive(Debug, Clone, Serialize)]
pub struct GoalOutcome {
    pub goal: Goal,
    pub ingest: IngestReport,
}

pub struct Coordinator {
    clarifier: Arc<dyn GoalClarifier>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn IngestStore>,
    executor: Arc<Executor>,
}

impl Coordinator {
    #[must_use]
    pub fn new(
        clarifier: Arc<dyn GoalClarifier>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn IngestStore>,
        executor: Arc<Executor>,
    ) -> Self {
        Self {
            clarifier,
            embedder,
            store,
            executor,
        }
    }

    /// Clarify, embed and store a new goal, then search its sources.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Llm`] if clarification or embedding fails and
    /// [`IngestError::Db`] if the goal cannot be stored. Scraper failures are
    /// reported in [`GoalOutcome::ingest`], never as an error.
    pub async fn process_new_goal(
        &self,
        user_id: Uuid,
        description: &str,
    ) -> Result<GoalOutcome, IngestError> {
        let clarified = self.clarifier.clarify_goal(description).await?;
        tracing::info!(
            %user_id,
            goal_type = %clarified.goal_type,
            keywords = clarified.filters.keywords.len(),
            "goal clarified"
        );
        self.process_clarified_goal(user_id, &clarified).await
    }

    /// Embed and store an already clarified goal, then search its sources.
    ///
    /// Used when clarification was refined interactively before storage.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Llm`] if embedding fails and [`IngestError::Db`]
    /// if the goal cannot be stored.
    pub async fn process_clarified_goal(
        &self,
        user_id: Uuid,
        clarified: &ClarifiedGoal,
    ) -> Result<GoalOutcome, IngestError> {
        let embedding = self.embedder.embed(&clarified.embedding_text()).await?;

        let goal = self
            .store
            .insert_goal(&NewGoal {
                user_id,
                description: &clarified.original_description,
                goal_type: clarified.goal_type,
                filters: &clarified.filters,
                embedding: Some(&embedding),
            })
            .await?;
        tracing::info!(goal_id = %goal.id, "goal stored");

        let ingest = self
            .executor
            .execute_search(goal.goal_type, &goal.filters)
            .await;

        Ok(GoalOutcome { goal, ingest })
    }

    /// Re-run the search for an existing goal.
    pub async fn refresh_goal(&self, goal: &Goal) -> IngestReport {
        tracing::info!(goal_id = %goal.id, goal_type = %goal.goal_type, "refreshing goal");
        self.executor
            .execute_search(goal.goal_type, &goal.filters)
            .await
    }
}
