//! Batch pass over active goals looking for freshly ingested matches.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use genie_core::{Goal, GoalStatus, Opportunity};
use genie_db::GoalRow;
use serde::Serialize;
use uuid::Uuid;

use crate::ranker::Ranker;

/// New matches for one goal.
#[derive(Debug, Clone, Serialize)]
pub struct GoalNotification {
    pub goal_id: Uuid,
    pub user_id: Uuid,
    pub new_opportunities: Vec<Opportunity>,
    pub should_notify: bool,
}

/// A goal whose check failed.
#[derive(Debug, Clone, Serialize)]
pub struct GoalFailure {
    pub goal_id: Uuid,
    pub error: String,
}

/// Outcome of one [`Monitor::run`] pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorReport {
    pub goals_checked: usize,
    pub notifications: Vec<GoalNotification>,
    pub failures: Vec<GoalFailure>,
}

/// Decode stored goals for a monitoring pass.
///
/// A row that fails to decode becomes a [`GoalFailure`] instead of aborting
/// the batch.
#[must_use]
pub fn decode_goals(rows: Vec<GoalRow>) -> (Vec<Goal>, Vec<GoalFailure>) {
    let mut goals = Vec::with_capacity(rows.len());
    let mut failures = Vec::new();
    for row in rows {
        let goal_id = row.id;
        match Goal::try_from(row) {
            Ok(goal) => goals.push(goal),
            Err(e) => {
                tracing::warn!(goal_id = %goal_id, error = %e, "skipping undecodable goal");
                failures.push(GoalFailure {
                    goal_id,
                    error: e.to_string(),
                });
            }
        }
    }
    (goals, failures)
}

/// Runs [`Ranker::find_new_since`] over many goals with bounded concurrency.
pub struct Monitor {
    ranker: Arc<Ranker>,
    window_hours: i64,
    max_concurrency: usize,
}

impl Monitor {
    #[must_use]
    pub fn new(ranker: Arc<Ranker>, window_hours: i64, max_concurrency: usize) -> Self {
        Self {
            ranker,
            window_hours,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Check every active goal in `goals`.
    ///
    /// Goals in any other status are ignored. A failing goal is recorded in
    /// [`MonitorReport::failures`] and does not stop the pass. Notifications
    /// come back in input order.
    pub async fn run(&self, goals: &[Goal]) -> MonitorReport {
        let active: Vec<&Goal> = goals
            .iter()
            .filter(|g| g.status == GoalStatus::Active)
            .collect();

        let keys: Vec<(usize, Uuid, Uuid)> = active
            .iter()
            .enumerate()
            .map(|(position, goal)| (position, goal.id, goal.user_id))
            .collect();
        let mut outcomes: Vec<(usize, Uuid, Uuid, _)> = stream::iter(keys)
            .map(|(position, goal_id, user_id)| {
                let ranker = Arc::clone(&self.ranker);
                let window_hours = self.window_hours;
                async move {
                    let result = ranker.find_new_since(goal_id, window_hours).await;
                    (position, goal_id, user_id, result)
                }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;
        outcomes.sort_by_key(|(position, ..)| *position);

        let mut report = MonitorReport {
            goals_checked: active.len(),
            ..MonitorReport::default()
        };

        for (_, goal_id, user_id, result) in outcomes {
            match result {
                Ok(new_opportunities) if new_opportunities.is_empty() => {}
                Ok(new_opportunities) => {
                    tracing::info!(
                        goal_id = %goal_id,
                        user_id = %user_id,
                        new = new_opportunities.len(),
                        "new opportunities for goal"
                    );
                    report.notifications.push(GoalNotification {
                        goal_id,
                        user_id,
                        should_notify: true,
                        new_opportunities,
                    });
                }
                Err(e) => {
                    tracing::error!(goal_id = %goal_id, error = %e, "goal check failed");
                    report.failures.push(GoalFailure {
                        goal_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            goals_checked = report.goals_checked,
            notifications = report.notifications.len(),
            failures = report.failures.len(),
            "monitoring pass complete"
        );
        report
    }

    /// [`Monitor::run`] over stored rows; undecodable rows are reported as
    /// failures alongside the goals whose check failed.
    pub async fn run_rows(&self, rows: Vec<GoalRow>) -> MonitorReport {
        let (goals, undecodable) = decode_goals(rows);
        let mut report = self.run(&goals).await;
        report.failures.extend(undecodable);
        report
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn row(goal_type: &str) -> GoalRow {
        GoalRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            description: "Find a Rust role".to_string(),
            goal_type: goal_type.to_string(),
            filters: json!({}),
            embedding: None,
            status: "active".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn decode_goals_keeps_good_rows_and_reports_bad_ones() {
        let good = row("job");
        let bad = row("moonlighting");
        let bad_id = bad.id;

        let (goals, failures) = decode_goals(vec![good.clone(), bad, row("grant")]);

        assert_eq!(goals.len(), 2);
        assert_eq!(goals[0].id, good.id);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].goal_id, bad_id);
        assert!(failures[0].error.contains("moonlighting"));
    }
}
