use clap::Parser;
use genie_core::{GoalStatus, OpportunityType};

use super::*;

const USER: &str = "7d3f3a4e-9b8c-4f62-a1d5-2c0e8b9f4a11";
const GOAL: &str = "0b6c1d2e-3f40-4a5b-8c6d-7e8f9a0b1c2d";
const OPPORTUNITY: &str = "f1e2d3c4-b5a6-4978-8695-a4b3c2d1e0f9";

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["genie"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_migrate_command() {
    let cli = Cli::try_parse_from(["genie", "migrate"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Migrate)));
}

#[test]
fn parses_goal_create() {
    let cli = Cli::try_parse_from([
        "genie",
        "goal",
        "create",
        "--user",
        USER,
        "Speaking slots at Rust conferences",
    ])
    .unwrap();

    assert!(matches!(
        cli.command,
        Some(Commands::Goal {
            command: GoalCommands::Create {
                ref description,
                interactive: false,
                ..
            }
        }) if description == "Speaking slots at Rust conferences"
    ));
}

#[test]
fn goal_create_requires_a_user() {
    assert!(Cli::try_parse_from(["genie", "goal", "create", "anything"]).is_err());
}

#[test]
fn parses_goal_status() {
    let cli =
        Cli::try_parse_from(["genie", "goal", "status", "--goal", GOAL, "paused"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Goal {
            command: GoalCommands::Status {
                status: GoalStatus::Paused,
                ..
            }
        })
    ));
}

#[test]
fn rejects_unknown_goal_status() {
    assert!(Cli::try_parse_from(["genie", "goal", "status", "--goal", GOAL, "archived"]).is_err());
}

#[test]
fn rank_defaults() {
    let cli = Cli::try_parse_from(["genie", "rank", "--goal", GOAL, "--user", USER]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Rank {
            limit: None,
            summary: false,
            json: false,
            ..
        })
    ));
}

#[test]
fn rank_rejects_malformed_ids() {
    assert!(Cli::try_parse_from(["genie", "rank", "--goal", "42", "--user", USER]).is_err());
}

#[test]
fn parses_new_since_window() {
    let cli =
        Cli::try_parse_from(["genie", "new-since", "--goal", GOAL, "--hours", "6"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::NewSince { hours: Some(6), .. })
    ));
}

#[test]
fn new_since_window_is_bounded() {
    for hours in ["0", "-3", "9223372036854775"] {
        let parsed = Cli::try_parse_from(["genie", "new-since", "--goal", GOAL, "--hours", hours]);
        assert!(parsed.is_err(), "--hours {hours} should be rejected");
    }
    let max = MAX_WINDOW_HOURS.to_string();
    let cli = Cli::try_parse_from(["genie", "new-since", "--goal", GOAL, "--hours", &max]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::NewSince { hours: Some(h), .. }) if h == MAX_WINDOW_HOURS
    ));
}

#[test]
fn parses_search_with_type_filter() {
    let cli = Cli::try_parse_from([
        "genie",
        "search",
        "--query",
        "async rust workshops",
        "--type",
        "event",
        "--limit",
        "5",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Search {
            ref query,
            opportunity_type: Some(OpportunityType::Event),
            limit: 5,
        }) if query == "async rust workshops"
    ));
}

#[test]
fn search_type_is_optional() {
    let cli = Cli::try_parse_from(["genie", "search", "--query", "grants"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Search {
            opportunity_type: None,
            limit: 50,
            ..
        })
    ));
}

#[test]
fn parses_feedback_stats_with_and_without_goal() {
    let cli = Cli::try_parse_from(["genie", "feedback", "stats", "--user", USER]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Feedback {
            command: FeedbackCommands::Stats { goal: None, .. }
        })
    ));

    let cli =
        Cli::try_parse_from(["genie", "feedback", "stats", "--user", USER, "--goal", GOAL]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Feedback {
            command: FeedbackCommands::Stats { goal: Some(_), .. }
        })
    ));
}

#[test]
fn parses_feedback_add() {
    let cli = Cli::try_parse_from([
        "genie",
        "feedback",
        "add",
        "--user",
        USER,
        "--goal",
        GOAL,
        "--opportunity",
        OPPORTUNITY,
        "--rating",
        "5",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Feedback {
            command: FeedbackCommands::Add {
                rating: 5,
                comment: None,
                ..
            }
        })
    ));
}

#[test]
fn feedback_rating_must_be_one_to_five() {
    for rating in ["0", "6"] {
        let parsed = Cli::try_parse_from([
            "genie",
            "feedback",
            "add",
            "--user",
            USER,
            "--goal",
            GOAL,
            "--opportunity",
            OPPORTUNITY,
            "--rating",
            rating,
        ]);
        assert!(parsed.is_err(), "rating {rating} should be rejected");
    }
}

#[test]
fn parses_scrape_run_with_type() {
    let cli = Cli::try_parse_from(["genie", "scrape", "run", "--type", "speaking"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Scrape {
            command: ScrapeCommands::Run {
                opportunity_type: Some(OpportunityType::Speaking)
            }
        })
    ));
}

#[test]
fn truncate_marks_the_cut() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a much longer title", 6), "a much...");
}
