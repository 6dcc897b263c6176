use std::sync::Arc;

use time::OffsetDateTime;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::{BatchPlanner, MealPlanner, SubjectSource};

pub struct ScheduleSettings {
    pub plan_cron: String,
    pub purge_cron: String,
}

pub async fn scheduler(
    planner: Arc<MealPlanner>,
    subjects: Arc<dyn SubjectSource>,
    settings: &ScheduleSettings,
) -> Result<JobScheduler, JobSchedulerError> {
    let sched = JobScheduler::new().await?;

    // Daily plans for every known subject
    let plan_planner = planner.clone();
    sched
        .add(Job::new_async(settings.plan_cron.as_str(), move |uuid, mut l| {
            let planner = plan_planner.clone();
            let subjects = subjects.clone();

            Box::pin(async move {
                let batch = BatchPlanner::new(planner);
                let today = OffsetDateTime::now_utc().date();

                if let Err(err) = batch.run_all(subjects.as_ref(), today).await {
                    tracing::error!(err = %err, "failed to run scheduled meal planning");
                }

                if let Err(err) = l.next_tick_for_job(uuid).await {
                    tracing::error!(err = %err, "failed to get next tick for meal planning");
                }
            })
        })?)
        .await?;

    // Usage ledger retention
    sched
        .add(Job::new_async(settings.purge_cron.as_str(), move |uuid, mut l| {
            let planner = planner.clone();

            Box::pin(async move {
                let today = OffsetDateTime::now_utc().date();

                if let Err(err) = planner.ledger().purge_older_than(today).await {
                    tracing::error!(err = %err, "failed to purge usage records");
                }

                if let Err(err) = l.next_tick_for_job(uuid).await {
                    tracing::error!(err = %err, "failed to get next tick for usage purge");
                }
            })
        })?)
        .await?;

    Ok(sched)
}
