//! Background job scheduler.
//!
//! Registers the recurring scrape and monitoring jobs. Notifications are
//! only logged; delivering them is left to whatever consumes the log.

use std::sync::Arc;

use genie_core::AppConfig;
use genie_ranker::Monitor;
use genie_scraper::Executor;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Everything the scheduled jobs need.
pub struct Jobs {
    pub pool: PgPool,
    pub executor: Arc<Executor>,
    pub monitor: Arc<Monitor>,
}

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if a cron expression is invalid or the
/// scheduler cannot be started.
pub async fn build_scheduler(
    jobs: Jobs,
    config: &AppConfig,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_scrape_job(&scheduler, &config.scrape_cron, Arc::clone(&jobs.executor)).await?;
    register_monitor_job(&scheduler, &config.monitor_cron, jobs.pool, jobs.monitor).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Scrape every registered source. Runs daily at 03:00 UTC unless
/// `GENIE_SCRAPE_CRON` says otherwise.
async fn register_scrape_job(
    scheduler: &JobScheduler,
    cron: &str,
    executor: Arc<Executor>,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let executor = Arc::clone(&executor);

        Box::pin(async move {
            tracing::info!("scheduler: starting scrape run");
            let report = executor.scrape_all().await;
            tracing::info!(
                stored = report.stored,
                duplicates = report.duplicates,
                failed_sources = report.failed_sources().len(),
                "scheduler: scrape run complete"
            );
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered scrape job");
    Ok(())
}

/// Check active goals for new matches. Hourly by default
/// (`GENIE_MONITOR_CRON`).
async fn register_monitor_job(
    scheduler: &JobScheduler,
    cron: &str,
    pool: PgPool,
    monitor: Arc<Monitor>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let monitor = Arc::clone(&monitor);

        Box::pin(async move {
            tracing::info!("scheduler: starting monitoring run");
            run_monitor_job(&pool, &monitor).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered monitor job");
    Ok(())
}

async fn run_monitor_job(pool: &PgPool, monitor: &Monitor) {
    let rows = match genie_db::list_active_goals(pool).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to load active goals");
            return;
        }
    };

    if rows.is_empty() {
        tracing::info!("scheduler: no active goals; skipping");
        return;
    }

    let report = monitor.run_rows(rows).await;
    for notification in report.notifications.iter().filter(|n| n.should_notify) {
        let titles: Vec<&str> = notification
            .new_opportunities
            .iter()
            .map(|o| o.title.as_str())
            .collect();
        tracing::info!(
            goal_id = %notification.goal_id,
            user_id = %notification.user_id,
            count = titles.len(),
            titles = ?titles,
            "scheduler: notify user of new opportunities"
        );
    }
}
