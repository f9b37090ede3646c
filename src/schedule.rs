use crate::coordinator::RunCoordinator;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

/// Register the scan job on the cron schedule and start ticking
pub async fn start_scheduler(
    schedule: &str,
    coordinator: Arc<RunCoordinator>,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .context("Failed to create scheduler")?;

    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let coordinator = coordinator.clone();
        Box::pin(async move {
            coordinator.run_once().await;
        })
    })
    .with_context(|| format!("Invalid CRON_SCHEDULE '{}'", schedule))?;

    scheduler.add(job).await.context("Failed to register scan job")?;
    scheduler.start().await.context("Failed to start scheduler")?;

    info!("Cron {} registered, entering loop", schedule);
    Ok(scheduler)
}
