//! Goal intake through the coordinator, with fake model and store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use genie_core::{
    ClarifiedGoal, Goal, GoalFilters, GoalStatus, OpportunityType, RawOpportunity, SourceRouting,
};
use genie_db::{DbError, NewGoal, NewScrapeLog};
use genie_llm::{Embedder, GoalClarifier, LlmError};
use genie_scraper::{
    Coordinator, Executor, IngestError, IngestStore, Scraper, ScraperError, ScraperRegistry,
};
use uuid::Uuid;

struct JobClarifier;

#[async_trait]
impl GoalClarifier for JobClarifier {
    async fn clarify_goal(&self, description: &str) -> Result<ClarifiedGoal, LlmError> {
        if description.is_empty() {
            return Err(LlmError::InvalidResponse("empty goal".to_string()));
        }
        Ok(ClarifiedGoal {
            original_description: description.to_string(),
            goal_type: OpportunityType::Job,
            filters: GoalFilters {
                keywords: vec!["rust".to_string()],
                remote: Some(true),
                ..GoalFilters::default()
            },
        })
    }
}

struct ConstEmbedder;

#[async_trait]
impl Embedder for ConstEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
        Ok(vec![1.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

struct RemoteOk;

#[async_trait]
impl Scraper for RemoteOk {
    fn source_name(&self) -> &str {
        "remoteok"
    }

    async fn scrape(&self, filters: &GoalFilters) -> Result<Vec<RawOpportunity>, ScraperError> {
        Ok(filters
            .keywords
            .iter()
            .map(|keyword| RawOpportunity {
                title: format!("{keyword} engineer"),
                description: None,
                source_url: format!("https://remoteok.example.com/{keyword}"),
                source_name: "remoteok".to_string(),
                opportunity_type: OpportunityType::Job,
                location: None,
                remote: true,
                compensation: None,
                tags: Vec::new(),
                raw_data: serde_json::Value::Null,
            })
            .collect())
    }
}

#[derive(Default)]
struct RecordingStore {
    goals: Mutex<Vec<Goal>>,
    opportunities: Mutex<Vec<String>>,
    goals_down: bool,
}

#[async_trait]
impl IngestStore for RecordingStore {
    async fn record_scrape(&self, _log: &NewScrapeLog<'_>) -> Result<(), DbError> {
        Ok(())
    }

    async fn insert_opportunity(
        &self,
        raw: &RawOpportunity,
        _embedding: Option<&[f32]>,
    ) -> Result<bool, DbError> {
        self.opportunities
            .lock()
            .unwrap()
            .push(raw.source_url.clone());
        Ok(true)
    }

    async fn insert_goal(&self, goal: &NewGoal<'_>) -> Result<Goal, DbError> {
        if self.goals_down {
            return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        let now = Utc::now();
        let stored = Goal {
            id: Uuid::new_v4(),
            user_id: goal.user_id,
            description: goal.description.to_string(),
            goal_type: goal.goal_type,
            filters: goal.filters.clone(),
            embedding: goal.embedding.map(<[f32]>::to_vec),
            status: GoalStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.goals.lock().unwrap().push(stored.clone());
        Ok(stored)
    }
}

fn coordinator(store: Arc<RecordingStore>) -> Coordinator {
    let mut registry = ScraperRegistry::new(SourceRouting::default());
    registry.register(Arc::new(RemoteOk));
    let embedder: Arc<dyn Embedder> = Arc::new(ConstEmbedder);
    let executor = Executor::new(Arc::new(registry), Arc::clone(&embedder), store.clone(), 2);
    Coordinator::new(Arc::new(JobClarifier), embedder, store, Arc::new(executor))
}

#[tokio::test]
async fn new_goal_is_clarified_embedded_stored_and_searched() {
    let store = Arc::new(RecordingStore::default());
    let user_id = Uuid::new_v4();

    let outcome = coordinator(Arc::clone(&store))
        .process_new_goal(user_id, "remote Rust backend roles")
        .await
        .unwrap();

    assert_eq!(outcome.goal.user_id, user_id);
    assert_eq!(outcome.goal.goal_type, OpportunityType::Job);
    assert_eq!(outcome.goal.description, "remote Rust backend roles");
    assert_eq!(outcome.goal.embedding, Some(vec![1.0, 0.0]));
    assert_eq!(outcome.goal.filters.keywords, vec!["rust"]);

    assert_eq!(outcome.ingest.stored, 1);
    assert_eq!(
        *store.opportunities.lock().unwrap(),
        vec!["https://remoteok.example.com/rust"]
    );
    assert_eq!(store.goals.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn clarification_failure_stores_nothing() {
    let store = Arc::new(RecordingStore::default());

    let err = coordinator(Arc::clone(&store))
        .process_new_goal(Uuid::new_v4(), "")
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Llm(_)));
    assert!(store.goals.lock().unwrap().is_empty());
    assert!(store.opportunities.lock().unwrap().is_empty());
}

#[tokio::test]
async fn goal_store_failure_skips_the_search() {
    let store = Arc::new(RecordingStore {
        goals_down: true,
        ..RecordingStore::default()
    });

    let err = coordinator(Arc::clone(&store))
        .process_new_goal(Uuid::new_v4(), "remote Rust backend roles")
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Db(_)));
    assert!(store.opportunities.lock().unwrap().is_empty());
}

#[tokio::test]
async fn refresh_reuses_the_stored_filters() {
    let store = Arc::new(RecordingStore::default());
    let coordinator = coordinator(Arc::clone(&store));
    let outcome = coordinator
        .process_new_goal(Uuid::new_v4(), "remote Rust backend roles")
        .await
        .unwrap();

    let mut goal = outcome.goal;
    goal.filters.keywords.push("tokio".to_string());
    let report = coordinator.refresh_goal(&goal).await;

    assert_eq!(report.scraped, 2);
    assert_eq!(store.opportunities.lock().unwrap().len(), 3);
}
