//! Wiring of clients, stores and services for command handlers.

use std::sync::Arc;

use anyhow::Context;
use genie_core::{AppConfig, SourceRouting};
use genie_llm::{Clarifier, LlmClient, LlmConfig};
use genie_ranker::{PgStore, Ranker, RankerConfig};
use genie_scraper::{registry_from_sources, Coordinator, Executor, HttpFetcher, PgIngestStore};
use sqlx::PgPool;

const SCRAPE_TIMEOUT_SECS: u64 = 30;
const SCRAPE_MAX_RETRIES: u32 = 2;
const SCRAPE_BACKOFF_BASE_MS: u64 = 1_000;

pub(crate) fn llm_client(config: &AppConfig) -> anyhow::Result<Arc<LlmClient>> {
    let client = LlmClient::new(LlmConfig::from_app_config(config)).context("building LLM client")?;
    Ok(Arc::new(client))
}

pub(crate) fn ranker(pool: &PgPool, config: &AppConfig) -> anyhow::Result<Ranker> {
    Ok(Ranker::new(
        Arc::new(PgStore::new(pool.clone())),
        llm_client(config)?,
        RankerConfig::from_app_config(config),
    ))
}

/// Routing from the sources file, or the built-in routing if it is absent.
pub(crate) fn source_routing(config: &AppConfig) -> anyhow::Result<SourceRouting> {
    if config.sources_path.exists() {
        Ok(genie_core::load_source_routing(&config.sources_path)?)
    } else {
        tracing::warn!(
            path = %config.sources_path.display(),
            "sources file not found, using default routing with no feeds"
        );
        Ok(SourceRouting::default())
    }
}

pub(crate) fn executor(
    pool: &PgPool,
    config: &AppConfig,
    llm: &Arc<LlmClient>,
) -> anyhow::Result<Executor> {
    let fetcher = Arc::new(
        HttpFetcher::new(
            SCRAPE_TIMEOUT_SECS,
            &config.scraper_user_agent,
            SCRAPE_MAX_RETRIES,
            SCRAPE_BACKOFF_BASE_MS,
        )
        .context("building HTTP fetcher")?,
    );
    let registry = registry_from_sources(source_routing(config)?, &fetcher);

    Ok(Executor::new(
        Arc::new(registry),
        llm.clone(),
        Arc::new(PgIngestStore::new(pool.clone())),
        config.embedding_dim,
    ))
}

pub(crate) fn coordinator(
    pool: &PgPool,
    config: &AppConfig,
    llm: &Arc<LlmClient>,
) -> anyhow::Result<Coordinator> {
    let executor = executor(pool, config, llm)?;
    Ok(Coordinator::new(
        Arc::new(Clarifier::new(Arc::clone(llm))),
        llm.clone(),
        Arc::new(PgIngestStore::new(pool.clone())),
        Arc::new(executor),
    ))
}
