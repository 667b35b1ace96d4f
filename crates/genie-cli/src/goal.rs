//! Goal command handlers.

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use genie_core::{AppConfig, ClarifiedGoal, Goal, GoalStatus};
use genie_llm::{Clarifier, Embedder, GoalClarifier, QaPair};
use genie_scraper::{GoalOutcome, IngestReport};
use sqlx::PgPool;
use uuid::Uuid;

use crate::services;

/// Sub-commands available under `goal`.
#[derive(Debug, Subcommand)]
pub enum GoalCommands {
    /// Clarify a free-text goal, store it, and search its sources
    Create {
        /// Owner of the goal
        #[arg(long)]
        user: Uuid,
        /// What the user is looking for, in their own words
        description: String,
        /// Answer follow-up questions before the goal is stored
        #[arg(long)]
        interactive: bool,
    },
    /// Re-run the source search for an existing goal
    Refresh {
        #[arg(long)]
        goal: Uuid,
    },
    /// Change a goal's status (active, paused, completed)
    Status {
        #[arg(long)]
        goal: Uuid,
        status: GoalStatus,
    },
    /// List a user's goals
    List {
        #[arg(long)]
        user: Uuid,
    },
}

pub(crate) async fn run(
    pool: &PgPool,
    config: &AppConfig,
    command: GoalCommands,
) -> anyhow::Result<()> {
    match command {
        GoalCommands::Create {
            user,
            description,
            interactive,
        } => run_goal_create(pool, config, user, &description, interactive).await,
        GoalCommands::Refresh { goal } => run_goal_refresh(pool, config, goal).await,
        GoalCommands::Status { goal, status } => {
            genie_db::update_goal_status(pool, goal, status)
                .await
                .with_context(|| format!("updating goal {goal}"))?;
            println!("goal {goal} is now {status}");
            Ok(())
        }
        GoalCommands::List { user } => run_goal_list(pool, user).await,
    }
}

/// Create a goal, optionally refining it with the user's answers first.
///
/// # Errors
///
/// Returns an error if clarification, embedding or storage fails.
async fn run_goal_create(
    pool: &PgPool,
    config: &AppConfig,
    user_id: Uuid,
    description: &str,
    interactive: bool,
) -> anyhow::Result<()> {
    let llm = services::llm_client(config)?;
    let coordinator = services::coordinator(pool, config, &llm)?;

    let outcome = if interactive {
        let clarifier = Clarifier::new(Arc::clone(&llm));
        let preliminary = clarifier.clarify_goal(description).await?;
        let questions = clarifier
            .clarifying_questions(description, &preliminary)
            .await;
        let answers = ask(&questions)?;
        let refined = if answers.is_empty() {
            preliminary
        } else {
            clarifier.refine_goal(&preliminary, &answers).await
        };
        coordinator.process_clarified_goal(user_id, &refined).await?
    } else {
        coordinator.process_new_goal(user_id, description).await?
    };

    print_outcome(&outcome);
    Ok(())
}

/// Prompt for each question on stdin. Blank answers are dropped.
fn ask(questions: &[String]) -> anyhow::Result<Vec<QaPair>> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut answers = Vec::new();

    for question in questions {
        print!("{question}\n> ");
        stdout.flush()?;
        let mut line = String::new();
        stdin.lock().read_line(&mut line)?;
        let answer = line.trim();
        if !answer.is_empty() {
            answers.push(QaPair {
                question: question.clone(),
                answer: answer.to_string(),
            });
        }
    }
    Ok(answers)
}

fn print_outcome(outcome: &GoalOutcome) {
    let goal = &outcome.goal;
    println!("goal {} ({})", goal.id, goal.goal_type);
    if !goal.filters.keywords.is_empty() {
        println!("  keywords: {}", goal.filters.keywords.join(", "));
    }
    if let Some(location) = &goal.filters.location {
        println!("  location: {location}");
    }
    print_ingest(&outcome.ingest);
}

pub(crate) fn print_ingest(report: &IngestReport) {
    println!(
        "  scraped {} listing(s) from {} source(s): {} new, {} already known, {} failed",
        report.scraped,
        report.sources.len(),
        report.stored,
        report.duplicates,
        report.failed
    );
    for source in &report.sources {
        if let Some(error) = &source.error {
            println!("  source {} failed: {error}", source.source_name);
        }
    }
    if report.scraped > 0 && !report.embedded {
        println!("  warning: embeddings unavailable; new opportunities will not rank yet");
    }
}

async fn load_goal(pool: &PgPool, goal_id: Uuid) -> anyhow::Result<Goal> {
    let row = genie_db::get_goal(pool, goal_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("goal {goal_id} not found"))?;
    Ok(Goal::try_from(row)?)
}

async fn run_goal_refresh(pool: &PgPool, config: &AppConfig, goal_id: Uuid) -> anyhow::Result<()> {
    let mut goal = load_goal(pool, goal_id).await?;
    let llm = services::llm_client(config)?;
    let coordinator = services::coordinator(pool, config, &llm)?;

    if goal.embedding.is_none() {
        let clarified = ClarifiedGoal {
            original_description: goal.description.clone(),
            goal_type: goal.goal_type,
            filters: goal.filters.clone(),
        };
        let embedding = llm.embed(&clarified.embedding_text()).await?;
        genie_db::update_goal_embedding(pool, goal.id, &goal.filters, &embedding).await?;
        goal.embedding = Some(embedding);
        println!("goal {} had no embedding; re-embedded", goal.id);
    }

    let report = coordinator.refresh_goal(&goal).await;
    println!("goal {} ({})", goal.id, goal.goal_type);
    print_ingest(&report);
    Ok(())
}

async fn run_goal_list(pool: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
    let rows = genie_db::list_goals_for_user(pool, user_id).await?;
    if rows.is_empty() {
        println!("no goals for user {user_id}; run `goal create` first");
        return Ok(());
    }

    println!("{:<38}{:<10}{:<11}DESCRIPTION", "GOAL", "TYPE", "STATUS");
    for row in rows {
        let goal = Goal::try_from(row)?;
        println!(
            "{:<38}{:<10}{:<11}{}",
            goal.id.to_string(),
            goal.goal_type.as_str(),
            goal.status.as_str(),
            crate::truncate(&goal.description, 60)
        );
    }
    Ok(())
}
