//! Opportunity ingestion and goal intake.
//!
//! Scrapers are registered in a [`ScraperRegistry`] and routed by goal type.
//! The [`Executor`] runs them, embeds the results and stores new
//! opportunities; the [`Coordinator`] turns a free-text goal into a stored
//! goal and triggers the first search.

pub mod coordinator;
pub mod error;
pub mod executor;
pub mod feed;
pub mod fetch;
pub mod normalize;
mod rate_limit;
pub mod scraper;
pub mod store;

pub use coordinator::{Coordinator, GoalOutcome};
pub use error::{IngestError, ScraperError};
pub use executor::{Executor, IngestReport, SourceOutcome};
pub use feed::{registry_from_sources, JsonFeedScraper, DEFAULT_MAX_ITEMS};
pub use fetch::HttpFetcher;
pub use normalize::{extract_items, normalize_listing};
pub use scraper::{Scraper, ScraperRegistry};
pub use store::{IngestStore, PgIngestStore};
