use std::sync::Arc;

use anyhow::Result;
use nutriplan_mealplan::{
    BatchPlanner, BatchReport, MealPlanner, SqliteCandidatePool, SqlitePlanPersister,
    SqliteProfileProvider, SqliteUsageStore, UsageHistoryLedger,
};
use sqlx::SqlitePool;
use time::Date;
use tokio_cron_scheduler::JobScheduler;

use crate::Config;

/// Sqlite-backed planner wired from configuration.
#[derive(Clone)]
pub struct Planning {
    pub planner: Arc<MealPlanner>,
    pub profiles: Arc<SqliteProfileProvider>,
}

impl Planning {
    pub fn new(pool: SqlitePool, config: &Config) -> Result<Self> {
        let catalog = config.catalog()?;
        let profiles = Arc::new(SqliteProfileProvider::new(pool.clone()));

        let planner = MealPlanner::new(
            Arc::new(catalog),
            profiles.clone(),
            Arc::new(SqliteCandidatePool::new(pool.clone())),
            UsageHistoryLedger::new(Arc::new(SqliteUsageStore::new(pool.clone()))),
            Arc::new(SqlitePlanPersister::new(pool)),
        )
        .settings(config.planner_settings());

        Ok(Self {
            planner: Arc::new(planner),
            profiles,
        })
    }

    /// Plan every subject with a stored health profile.
    pub async fn plan(&self, plan_date: Date) -> Result<BatchReport> {
        let report = BatchPlanner::new(self.planner.clone())
            .run_all(self.profiles.as_ref(), plan_date)
            .await?;

        Ok(report)
    }

    pub async fn purge(&self, today: Date) -> Result<u64> {
        Ok(self.planner.ledger().purge_older_than(today).await?)
    }

    pub async fn scheduler(&self, config: &Config) -> Result<JobScheduler> {
        let sched = nutriplan_mealplan::scheduler(
            self.planner.clone(),
            self.profiles.clone(),
            &config.schedule_settings(),
        )
        .await?;

        Ok(sched)
    }
}
