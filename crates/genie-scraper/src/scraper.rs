//! The scraper capability and the registry that routes goal types to it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use genie_core::{GoalFilters, OpportunityType, RawOpportunity, SourceRouting};

use crate::error::ScraperError;

/// A source of opportunities.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Stable name used for routing and scrape logs.
    fn source_name(&self) -> &str;

    async fn scrape(&self, filters: &GoalFilters) -> Result<Vec<RawOpportunity>, ScraperError>;
}

/// Registered scrapers plus the goal-type routing table.
pub struct ScraperRegistry {
    scrapers: HashMap<String, Arc<dyn Scraper>>,
    routing: SourceRouting,
}

impl ScraperRegistry {
    #[must_use]
    pub fn new(routing: SourceRouting) -> Self {
        Self {
            scrapers: HashMap::new(),
            routing,
        }
    }

    /// Register a scraper under its source name, replacing any previous one.
    pub fn register(&mut self, scraper: Arc<dyn Scraper>) {
        let name = scraper.source_name().to_owned();
        if self.scrapers.insert(name.clone(), scraper).is_some() {
            tracing::warn!(source = %name, "replacing previously registered scraper");
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Scraper>> {
        self.scrapers.get(name).cloned()
    }

    /// Scrapers routed for `goal_type`, in routing order.
    ///
    /// Routed names with no registered scraper are skipped.
    #[must_use]
    pub fn for_goal_type(&self, goal_type: OpportunityType) -> Vec<Arc<dyn Scraper>> {
        self.routing
            .sources_for(goal_type)
            .iter()
            .filter_map(|name| {
                let scraper = self.scrapers.get(name).cloned();
                if scraper.is_none() {
                    tracing::debug!(source = %name, goal_type = %goal_type, "no scraper registered");
                }
                scraper
            })
            .collect()
    }

    /// Every registered scraper, ordered by name.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<dyn Scraper>> {
        let mut names: Vec<&String> = self.scrapers.keys().collect();
        names.sort();
        names
            .into_iter()
            .filter_map(|name| self.scrapers.get(name).cloned())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scrapers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scrapers.is_empty()
    }
}
