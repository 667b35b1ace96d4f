//! Scraper for JSON feeds described in the sources file.

use std::sync::Arc;

use async_trait::async_trait;
use genie_core::{FeedSource, GoalFilters, RawOpportunity, SourceRouting};
use serde_json::Value;

use crate::error::ScraperError;
use crate::fetch::HttpFetcher;
use crate::normalize::{extract_items, normalize_listing};
use crate::scraper::{Scraper, ScraperRegistry};

/// Maximum listings taken from one feed per scrape.
pub const DEFAULT_MAX_ITEMS: usize = 100;

/// Fetches a JSON document and maps each listing with the feed's field names.
///
/// Goal filters are not applied here; relevance is decided by ranking.
pub struct JsonFeedScraper {
    feed: FeedSource,
    fetcher: Arc<HttpFetcher>,
    max_items: usize,
}

impl JsonFeedScraper {
    #[must_use]
    pub fn new(feed: FeedSource, fetcher: Arc<HttpFetcher>) -> Self {
        Self {
            feed,
            fetcher,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }

    #[must_use]
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }
}

#[async_trait]
impl Scraper for JsonFeedScraper {
    fn source_name(&self) -> &str {
        &self.feed.name
    }

    async fn scrape(&self, _filters: &GoalFilters) -> Result<Vec<RawOpportunity>, ScraperError> {
        let document: Value = self.fetcher.get_json(&self.feed.url).await?;
        let items = extract_items(&self.feed.name, &document, self.feed.items_path.as_deref())?;

        let mut opportunities = Vec::new();
        for listing in items.iter().take(self.max_items) {
            match normalize_listing(&self.feed, listing) {
                Ok(raw) => opportunities.push(raw),
                Err(e) => {
                    tracing::warn!(source = %self.feed.name, error = %e, "skipping listing");
                }
            }
        }

        tracing::info!(
            source = %self.feed.name,
            listings = items.len(),
            normalized = opportunities.len(),
            "scraped feed"
        );
        Ok(opportunities)
    }
}

/// Build a registry from the sources file, with one [`JsonFeedScraper`]
/// registered per configured feed.
#[must_use]
pub fn registry_from_sources(routing: SourceRouting, fetcher: &Arc<HttpFetcher>) -> ScraperRegistry {
    let feeds = routing.feeds.clone();
    let mut registry = ScraperRegistry::new(routing);
    for feed in feeds {
        registry.register(Arc::new(JsonFeedScraper::new(feed, Arc::clone(fetcher))));
    }
    registry
}
