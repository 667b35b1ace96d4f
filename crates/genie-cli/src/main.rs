mod feedback;
mod goal;
mod rank;
mod scrape;
mod services;

use clap::{Parser, Subcommand};
use genie_core::{OpportunityType, MAX_WINDOW_HOURS};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::feedback::FeedbackCommands;
use crate::goal::GoalCommands;
use crate::scrape::ScrapeCommands;

#[derive(Debug, Parser)]
#[command(name = "genie")]
#[command(about = "Genie opportunity matching command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create and manage goals
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Rank stored opportunities for a goal
    Rank {
        /// Goal to rank for
        #[arg(long)]
        goal: Uuid,
        /// User whose feedback adjusts the ranking
        #[arg(long)]
        user: Uuid,
        /// Maximum number of results (defaults to `GENIE_RANK_DEFAULT_LIMIT`)
        #[arg(long)]
        limit: Option<usize>,
        /// Also print a natural-language summary of the top results
        #[arg(long)]
        summary: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show strongly matching opportunities ingested recently
    NewSince {
        #[arg(long)]
        goal: Uuid,
        /// Look-back window in hours (defaults to `GENIE_MONITOR_WINDOW_HOURS`)
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=MAX_WINDOW_HOURS))]
        hours: Option<i64>,
    },
    /// Semantic search over stored opportunities by free text
    Search {
        #[arg(long)]
        query: String,
        /// Only return opportunities of this type
        #[arg(long = "type")]
        opportunity_type: Option<OpportunityType>,
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Run one monitoring pass over all active goals
    Monitor,
    /// Record and inspect feedback
    Feedback {
        #[command(subcommand)]
        command: FeedbackCommands,
    },
    /// Run scrapers and inspect scrape history
    Scrape {
        #[command(subcommand)]
        command: ScrapeCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("genie: run `genie --help` for available commands");
        return Ok(());
    };

    let config = genie_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool_config = genie_db::PoolConfig::from_app_config(&config);
    let pool = genie_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Migrate => {
            let applied = genie_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Goal { command } => goal::run(&pool, &config, command).await?,
        Commands::Rank {
            goal,
            user,
            limit,
            summary,
            json,
        } => {
            let limit = limit.unwrap_or(config.rank_default_limit);
            rank::run_rank(&pool, &config, goal, user, limit, summary, json).await?;
        }
        Commands::NewSince { goal, hours } => {
            let hours = hours.unwrap_or(config.monitor_window_hours);
            rank::run_new_since(&pool, &config, goal, hours).await?;
        }
        Commands::Search {
            query,
            opportunity_type,
            limit,
        } => rank::run_search(&pool, &config, &query, opportunity_type, limit).await?,
        Commands::Monitor => rank::run_monitor(&pool, &config).await?,
        Commands::Feedback { command } => feedback::run(&pool, command).await?,
        Commands::Scrape { command } => scrape::run(&pool, &config, command).await?,
    }

    Ok(())
}

/// Shorten `text` to `max` characters, marking the cut with `...`.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests;
