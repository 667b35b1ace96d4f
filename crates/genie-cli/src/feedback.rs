//! Feedback command handlers.

use clap::Subcommand;
use genie_core::Feedback;
use genie_db::NewFeedback;
use genie_ranker::FeedbackSignal;
use sqlx::PgPool;
use uuid::Uuid;

/// Sub-commands available under `feedback`.
#[derive(Debug, Subcommand)]
pub enum FeedbackCommands {
    /// Rate an opportunity for a goal (1-5)
    Add {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        goal: Uuid,
        #[arg(long)]
        opportunity: Uuid,
        /// 4 or 5 boosts, 1 or 2 penalizes, 3 is neutral
        #[arg(long, value_parser = clap::value_parser!(i32).range(1..=5))]
        rating: i32,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Show a user's feedback for a goal, oldest first
    List {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        goal: Uuid,
    },
    /// Average rating and count for a user, optionally for one goal
    Stats {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        goal: Option<Uuid>,
    },
}

pub(crate) async fn run(pool: &PgPool, command: FeedbackCommands) -> anyhow::Result<()> {
    match command {
        FeedbackCommands::Add {
            user,
            goal,
            opportunity,
            rating,
            comment,
        } => {
            let row = genie_db::insert_feedback(
                pool,
                &NewFeedback {
                    user_id: user,
                    opportunity_id: opportunity,
                    goal_id: goal,
                    rating,
                    comment: comment.as_deref(),
                },
            )
            .await?;
            println!(
                "recorded rating {} for opportunity {} ({:?}, weight {:.1})",
                row.rating,
                row.opportunity_id,
                FeedbackSignal::from_rating(row.rating),
                FeedbackSignal::from_rating(row.rating).weight()
            );
            Ok(())
        }
        FeedbackCommands::List { user, goal } => {
            let rows = genie_db::list_feedback_for_goal(pool, user, goal).await?;
            if rows.is_empty() {
                println!("no feedback from user {user} for goal {goal}");
                return Ok(());
            }

            println!("{:<18}{:<38}{:<8}COMMENT", "RATED", "OPPORTUNITY", "RATING");
            for feedback in rows.into_iter().map(Feedback::from) {
                println!(
                    "{:<18}{:<38}{:<8}{}",
                    feedback.created_at.format("%Y-%m-%d %H:%M"),
                    feedback.opportunity_id.to_string(),
                    feedback.rating,
                    feedback.comment.as_deref().unwrap_or_default()
                );
            }
            Ok(())
        }
        FeedbackCommands::Stats { user, goal } => {
            let stats = genie_db::feedback_stats(pool, user, goal).await?;
            let scope = goal.map_or_else(|| "all goals".to_string(), |g| format!("goal {g}"));
            println!(
                "user {user}, {scope}: {} rating(s), average {:.2}",
                stats.total_feedback, stats.average_rating
            );
            Ok(())
        }
    }
}
