//! Scrape command handlers.

use clap::Subcommand;
use genie_core::{AppConfig, GoalFilters, Opportunity, OpportunityType};
use sqlx::PgPool;

use crate::services;

/// Sub-commands available under `scrape`.
#[derive(Debug, Subcommand)]
pub enum ScrapeCommands {
    /// Run scrapers once and store what they find
    Run {
        /// Only run the sources routed for this type
        #[arg(long = "type")]
        opportunity_type: Option<OpportunityType>,
    },
    /// Show recent scrape runs
    Logs {
        /// Filter by source name
        #[arg(long)]
        source: Option<String>,
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Show the configured sources and their routing
    Sources,
    /// List stored opportunities, newest first
    Opportunities {
        #[arg(long = "type")]
        opportunity_type: Option<OpportunityType>,
        #[arg(long, default_value = "20")]
        limit: i64,
        #[arg(long, default_value = "0")]
        offset: i64,
    },
}

pub(crate) async fn run(
    pool: &PgPool,
    config: &AppConfig,
    command: ScrapeCommands,
) -> anyhow::Result<()> {
    match command {
        ScrapeCommands::Run { opportunity_type } => {
            let llm = services::llm_client(config)?;
            let executor = services::executor(pool, config, &llm)?;
            let report = match opportunity_type {
                Some(goal_type) => {
                    executor
                        .execute_search(goal_type, &GoalFilters::default())
                        .await
                }
                None => executor.scrape_all().await,
            };
            crate::goal::print_ingest(&report);
            Ok(())
        }
        ScrapeCommands::Logs { source, limit } => {
            run_scrape_logs(pool, source.as_deref(), limit).await
        }
        ScrapeCommands::Sources => run_sources(config),
        ScrapeCommands::Opportunities {
            opportunity_type,
            limit,
            offset,
        } => run_list_opportunities(pool, opportunity_type, limit, offset).await,
    }
}

async fn run_scrape_logs(pool: &PgPool, source: Option<&str>, limit: i64) -> anyhow::Result<()> {
    let logs = genie_db::list_recent_scrape_logs(pool, source, limit).await?;
    if logs.is_empty() {
        println!("no scrape runs recorded; run `scrape run` first");
        return Ok(());
    }

    println!(
        "{:<18}{:<16}{:<9}{:<7}ERROR",
        "STARTED", "SOURCE", "STATUS", "FOUND"
    );
    for log in &logs {
        println!(
            "{:<18}{:<16}{:<9}{:<7}{}",
            log.started_at.format("%Y-%m-%d %H:%M"),
            crate::truncate(&log.source_name, 14),
            log.status,
            log.opportunities_found,
            log.error_log
                .as_deref()
                .map(|e| crate::truncate(e, 60))
                .unwrap_or_default()
        );
    }
    Ok(())
}

fn run_sources(config: &AppConfig) -> anyhow::Result<()> {
    let routing = services::source_routing(config)?;

    for goal_type in OpportunityType::ALL {
        let sources = routing.sources_for(goal_type);
        let listed = if sources.is_empty() {
            "(none)".to_string()
        } else {
            sources.join(", ")
        };
        println!("{:<10}{listed}", goal_type.as_str());
    }

    if routing.feeds.is_empty() {
        println!("\nno JSON feeds configured in {}", config.sources_path.display());
    } else {
        println!("\nfeeds:");
        for feed in &routing.feeds {
            println!("  {:<16}{:<10}{}", feed.name, feed.opportunity_type.as_str(), feed.url);
        }
    }
    Ok(())
}

async fn run_list_opportunities(
    pool: &PgPool,
    opportunity_type: Option<OpportunityType>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<()> {
    let total = genie_db::count_opportunities(pool).await?;
    let rows = genie_db::list_opportunities(pool, opportunity_type, limit, offset).await?;

    println!("{total} opportunities stored");
    if rows.is_empty() {
        return Ok(());
    }

    println!("{:<38}{:<10}{:<14}TITLE", "ID", "TYPE", "SOURCE");
    for row in rows {
        let opportunity = Opportunity::try_from(row)?;
        println!(
            "{:<38}{:<10}{:<14}{}",
            opportunity.id.to_string(),
            opportunity.opportunity_type.as_str(),
            crate::truncate(&opportunity.source_name, 12),
            crate::truncate(&opportunity.title, 60)
        );
    }
    Ok(())
}
