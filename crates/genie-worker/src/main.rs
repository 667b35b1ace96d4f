mod scheduler;

use std::sync::Arc;

use anyhow::Context;
use genie_core::{AppConfig, SourceRouting};
use genie_llm::{LlmClient, LlmConfig};
use genie_ranker::{Monitor, PgStore, Ranker, RankerConfig};
use genie_scraper::{registry_from_sources, Executor, HttpFetcher, PgIngestStore};
use tracing_subscriber::EnvFilter;

use crate::scheduler::Jobs;

/// Per-request timeout for source fetches.
const SCRAPE_TIMEOUT_SECS: u64 = 30;
const SCRAPE_MAX_RETRIES: u32 = 3;
const SCRAPE_BACKOFF_BASE_MS: u64 = 1_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(genie_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = genie_db::PoolConfig::from_app_config(&config);
    let pool = genie_db::connect_pool(&config.database_url, pool_config).await?;
    genie_db::run_migrations(&pool).await?;

    let jobs = build_jobs(pool, &config)?;
    let mut scheduler = scheduler::build_scheduler(jobs, &config).await?;
    tracing::info!("worker started");

    shutdown_signal().await;
    scheduler.shutdown().await?;
    Ok(())
}

fn load_routing(config: &AppConfig) -> anyhow::Result<SourceRouting> {
    if !config.sources_path.exists() {
        tracing::warn!(
            path = %config.sources_path.display(),
            "sources file not found, using default routing with no feeds"
        );
        return Ok(SourceRouting::default());
    }
    let routing = genie_core::load_source_routing(&config.sources_path)?;
    tracing::info!(
        path = %config.sources_path.display(),
        feeds = routing.feeds.len(),
        "loaded source routing"
    );
    Ok(routing)
}

fn build_jobs(pool: sqlx::PgPool, config: &AppConfig) -> anyhow::Result<Jobs> {
    let llm = Arc::new(
        LlmClient::new(LlmConfig::from_app_config(config)).context("building LLM client")?,
    );

    let fetcher = Arc::new(
        HttpFetcher::new(
            SCRAPE_TIMEOUT_SECS,
            &config.scraper_user_agent,
            SCRAPE_MAX_RETRIES,
            SCRAPE_BACKOFF_BASE_MS,
        )
        .context("building HTTP fetcher")?,
    );
    let registry = registry_from_sources(load_routing(config)?, &fetcher);
    if registry.is_empty() {
        tracing::warn!("no scrapers registered; the scrape job will find nothing");
    }

    let executor = Executor::new(
        Arc::new(registry),
        llm.clone(),
        Arc::new(PgIngestStore::new(pool.clone())),
        config.embedding_dim,
    );

    let ranker = Ranker::new(
        Arc::new(PgStore::new(pool.clone())),
        llm,
        RankerConfig::from_app_config(config),
    );
    let monitor = Monitor::new(
        Arc::new(ranker),
        config.monitor_window_hours,
        config.monitor_max_concurrency,
    );

    Ok(Jobs {
        pool,
        executor: Arc::new(executor),
        monitor: Arc::new(monitor),
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping scheduler");
}
