//! Ingestion: run scrapers, embed what they found, store new opportunities.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use genie_core::{GoalFilters, OpportunityType, RawOpportunity};
use genie_db::{NewScrapeLog, ScrapeStatus};
use genie_llm::Embedder;
use serde::Serialize;

use crate::scraper::{Scraper, ScraperRegistry};
use crate::store::IngestStore;

/// What one scraper produced during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceOutcome {
    pub source_name: String,
    pub found: usize,
    /// Error text when the scraper failed.
    pub error: Option<String>,
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub sources: Vec<SourceOutcome>,
    /// Listings returned by all scrapers together.
    pub scraped: usize,
    /// Newly stored opportunities.
    pub stored: usize,
    /// Listings whose `source_url` was already stored.
    pub duplicates: usize,
    /// Listings that failed to store.
    pub failed: usize,
    /// Whether embeddings were attached; `false` when embedding failed.
    pub embedded: bool,
}

impl IngestReport {
    #[must_use]
    pub fn failed_sources(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|s| s.error.is_some())
            .map(|s| s.source_name.as_str())
            .collect()
    }
}

/// Runs registered scrapers and stores their output.
pub struct Executor {
    registry: Arc<ScraperRegistry>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn IngestStore>,
    embedding_dim: usize,
}

impl Executor {
    #[must_use]
    pub fn new(
        registry: Arc<ScraperRegistry>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn IngestStore>,
        embedding_dim: usize,
    ) -> Self {
        Self {
            registry,
            embedder,
            store,
            embedding_dim,
        }
    }

    /// Search every source routed for `goal_type` and store what is new.
    ///
    /// Scrapers run concurrently. A failing scraper is logged and skipped; if
    /// embedding fails the opportunities are stored without vectors; a
    /// failing insert skips only that opportunity.
    pub async fn execute_search(
        &self,
        goal_type: OpportunityType,
        filters: &GoalFilters,
    ) -> IngestReport {
        let scrapers = self.registry.for_goal_type(goal_type);
        tracing::info!(
            goal_type = %goal_type,
            scrapers = scrapers.len(),
            "executing search"
        );
        self.run(&scrapers, filters).await
    }

    /// Scrape every registered source with no filters.
    pub async fn scrape_all(&self) -> IngestReport {
        let scrapers = self.registry.all();
        tracing::info!(scrapers = scrapers.len(), "scraping all sources");
        self.run(&scrapers, &GoalFilters::default()).await
    }

    async fn run(&self, scrapers: &[Arc<dyn Scraper>], filters: &GoalFilters) -> IngestReport {
        let results = join_all(
            scrapers
                .iter()
                .map(|scraper| self.scrape_with_logging(scraper.as_ref(), filters)),
        )
        .await;

        let mut report = IngestReport::default();
        let mut opportunities = Vec::new();
        for (outcome, found) in results {
            report.sources.push(outcome);
            opportunities.extend(found);
        }
        report.scraped = opportunities.len();

        if opportunities.is_empty() {
            return report;
        }

        let embeddings = self.embed(&opportunities).await;
        report.embedded = embeddings.iter().any(Option::is_some);

        for (raw, embedding) in opportunities.iter().zip(embeddings) {
            match self.store.insert_opportunity(raw, embedding.as_deref()).await {
                Ok(true) => report.stored += 1,
                Ok(false) => report.duplicates += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        source_url = %raw.source_url,
                        error = %e,
                        "failed to store opportunity"
                    );
                }
            }
        }

        tracing::info!(
            scraped = report.scraped,
            stored = report.stored,
            duplicates = report.duplicates,
            failed = report.failed,
            "ingestion complete"
        );
        report
    }

    /// Run one scraper and record a scrape log whatever the outcome.
    async fn scrape_with_logging(
        &self,
        scraper: &dyn Scraper,
        filters: &GoalFilters,
    ) -> (SourceOutcome, Vec<RawOpportunity>) {
        let source_name = scraper.source_name().to_owned();
        let started_at = Utc::now();
        let result = scraper.scrape(filters).await;
        let completed_at = Utc::now();

        let (outcome, found) = match result {
            Ok(found) => (
                SourceOutcome {
                    source_name: source_name.clone(),
                    found: found.len(),
                    error: None,
                },
                found,
            ),
            Err(e) => {
                tracing::error!(source = %source_name, error = %e, "scraper failed");
                (
                    SourceOutcome {
                        source_name: source_name.clone(),
                        found: 0,
                        error: Some(e.to_string()),
                    },
                    Vec::new(),
                )
            }
        };

        let log = NewScrapeLog {
            source_name: &source_name,
            status: if outcome.error.is_some() {
                ScrapeStatus::Failure
            } else {
                ScrapeStatus::Success
            },
            opportunities_found: i32::try_from(outcome.found).unwrap_or(i32::MAX),
            error_log: outcome.error.as_deref(),
            started_at,
            completed_at,
        };
        if let Err(e) = self.store.record_scrape(&log).await {
            tracing::warn!(source = %source_name, error = %e, "failed to record scrape log");
        }

        (outcome, found)
    }

    /// One embedding per opportunity, or `None` where unavailable.
    ///
    /// A failed batch yields all `None`. Vectors of the wrong length are
    /// dropped individually.
    async fn embed(&self, opportunities: &[RawOpportunity]) -> Vec<Option<Vec<f32>>> {
        let texts: Vec<String> = opportunities
            .iter()
            .map(RawOpportunity::embedding_text)
            .collect();

        let vectors = match self.embedder.embed_batch(&texts).await {
            Ok(vectors) if vectors.len() == texts.len() => vectors,
            Ok(vectors) => {
                tracing::error!(
                    expected = texts.len(),
                    actual = vectors.len(),
                    "embedding count mismatch, storing without embeddings"
                );
                return vec![None; opportunities.len()];
            }
            Err(e) => {
                tracing::error!(error = %e, "embedding failed, storing without embeddings");
                return vec![None; opportunities.len()];
            }
        };

        vectors
            .into_iter()
            .zip(opportunities)
            .map(|(vector, raw)| {
                if vector.len() == self.embedding_dim {
                    Some(vector)
                } else {
                    tracing::warn!(
                        source_url = %raw.source_url,
                        expected = self.embedding_dim,
                        actual = vector.len(),
                        "embedding has unexpected dimension, storing without it"
                    );
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
