//! Ranking and monitoring command handlers.

use std::sync::Arc;

use genie_core::{AppConfig, OpportunityType, ScoredOpportunity};
use genie_ranker::{search_by_text, Monitor, PgStore};
use sqlx::PgPool;
use uuid::Uuid;

use crate::services;

/// Rank opportunities for a goal and print them.
///
/// # Errors
///
/// Returns an error if the store cannot be queried. An unknown goal prints
/// an empty ranking.
pub(crate) async fn run_rank(
    pool: &PgPool,
    config: &AppConfig,
    goal_id: Uuid,
    user_id: Uuid,
    limit: usize,
    with_summary: bool,
    json: bool,
) -> anyhow::Result<()> {
    let ranker = services::ranker(pool, config)?;
    let ranked = ranker.rank(goal_id, user_id, limit).await?;
    let summary = if with_summary {
        Some(
            ranker
                .summarize(&ranked, ranker.config().summary_limit)
                .await,
        )
    } else {
        None
    };

    if json {
        let body = serde_json::json!({
            "goal_id": goal_id,
            "opportunities": ranked,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    if let Some(summary) = &summary {
        println!("{summary}\n");
    }
    print_ranking(&ranked);
    Ok(())
}

fn print_ranking(ranked: &[ScoredOpportunity]) {
    if ranked.is_empty() {
        println!("no matching opportunities");
        return;
    }

    println!(
        "{:<5}{:<11}{:<11}{:<8}{:<14}TITLE",
        "#", "RELEVANCE", "SIMILARITY", "WEIGHT", "SOURCE"
    );
    for (position, scored) in ranked.iter().enumerate() {
        println!(
            "{:<5}{:<11.3}{:<11.3}{:<8.1}{:<14}{}",
            position + 1,
            scored.relevance_score,
            scored.similarity_score,
            scored.feedback_weight,
            crate::truncate(&scored.opportunity.source_name, 12),
            crate::truncate(&scored.opportunity.title, 60)
        );
        println!("{:<49}{}", "", scored.opportunity.source_url);
    }
}

/// Free-text semantic search across stored opportunities.
///
/// # Errors
///
/// Returns an error if the query cannot be embedded or the store fails.
pub(crate) async fn run_search(
    pool: &PgPool,
    config: &AppConfig,
    query: &str,
    opportunity_type: Option<OpportunityType>,
    limit: usize,
) -> anyhow::Result<()> {
    let llm = services::llm_client(config)?;
    let store = PgStore::new(pool.clone());
    let found = search_by_text(&store, llm.as_ref(), query, opportunity_type, limit).await?;

    if found.is_empty() {
        println!("no opportunities match \"{query}\"");
        return Ok(());
    }

    println!("{:<11}{:<10}{:<14}TITLE", "SIMILARITY", "TYPE", "SOURCE");
    for (opportunity, similarity) in &found {
        println!(
            "{:<11.3}{:<10}{:<14}{}",
            similarity,
            opportunity.opportunity_type.as_str(),
            crate::truncate(&opportunity.source_name, 12),
            crate::truncate(&opportunity.title, 60)
        );
    }
    Ok(())
}

/// Print strongly similar opportunities ingested within `window_hours`.
///
/// # Errors
///
/// Returns an error if the store cannot be queried.
pub(crate) async fn run_new_since(
    pool: &PgPool,
    config: &AppConfig,
    goal_id: Uuid,
    window_hours: i64,
) -> anyhow::Result<()> {
    let ranker = services::ranker(pool, config)?;
    let fresh = ranker.find_new_since(goal_id, window_hours).await?;

    if fresh.is_empty() {
        println!("no new opportunities for goal {goal_id} in the last {window_hours}h");
        return Ok(());
    }

    println!("{:<18}{:<14}TITLE", "ADDED", "SOURCE");
    for opportunity in &fresh {
        println!(
            "{:<18}{:<14}{}",
            opportunity.created_at.format("%Y-%m-%d %H:%M"),
            crate::truncate(&opportunity.source_name, 12),
            crate::truncate(&opportunity.title, 60)
        );
    }
    Ok(())
}

/// Run one monitoring pass over all active goals and print what it found.
///
/// # Errors
///
/// Returns an error if the active goals cannot be loaded. Goals that fail
/// to decode or to check are printed and do not fail the command.
pub(crate) async fn run_monitor(pool: &PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let rows = genie_db::list_active_goals(pool).await?;
    if rows.is_empty() {
        println!("no active goals");
        return Ok(());
    }

    let monitor = Monitor::new(
        Arc::new(services::ranker(pool, config)?),
        config.monitor_window_hours,
        config.monitor_max_concurrency,
    );
    let report = monitor.run_rows(rows).await;

    println!(
        "checked {} goal(s): {} with new opportunities, {} failed",
        report.goals_checked,
        report.notifications.len(),
        report.failures.len()
    );
    for notification in &report.notifications {
        println!(
            "  goal {} (user {}): {} new",
            notification.goal_id,
            notification.user_id,
            notification.new_opportunities.len()
        );
        for opportunity in &notification.new_opportunities {
            println!("    - {}", crate::truncate(&opportunity.title, 70));
        }
    }
    for failure in &report.failures {
        println!("  goal {} failed: {}", failure.goal_id, failure.error);
    }
    Ok(())
}
