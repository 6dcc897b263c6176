use std::sync::Arc;

use nutriplan_shared::{Error, Result};
use nutriplan_shared::mealplan::SubjectKey;
use time::Date;
use tokio::sync::Semaphore;

use crate::{MealPlanner, SubjectSource};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchReport {
    pub planned: Vec<SubjectKey>,
    /// Subject and rendered error, one per failed subject
    pub failed: Vec<(SubjectKey, String)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Plans many subjects with bounded concurrency. One failing subject never aborts the rest.
pub struct BatchPlanner {
    planner: Arc<MealPlanner>,
}

impl BatchPlanner {
    pub fn new(planner: Arc<MealPlanner>) -> Self {
        Self { planner }
    }

    pub async fn run(&self, subjects: Vec<SubjectKey>, plan_date: Date) -> BatchReport {
        let permits = Semaphore::new(self.planner.planner_settings().concurrency.max(1));

        let results = futures::future::join_all(subjects.into_iter().map(|subject| {
            let permits = &permits;

            async move {
                let result = match permits.acquire().await {
                    Ok(_permit) => self.planner.plan_subject(&subject, plan_date).await,
                    Err(err) => Err(Error::from(anyhow::anyhow!(
                        "planner permit unavailable: {err}"
                    ))),
                };

                (subject, result)
            }
        }))
        .await;

        let mut report = BatchReport::default();
        for (subject, result) in results {
            match result {
                Ok(_) => report.planned.push(subject),
                Err(err) => {
                    tracing::error!(subject = %subject, err = %err, "failed to plan subject");
                    report.failed.push((subject, err.to_string()));
                }
            }
        }

        report.planned.sort();
        report.failed.sort();

        tracing::info!(
            plan_date = %plan_date,
            planned = report.planned.len(),
            failed = report.failed.len(),
            "batch planning finished"
        );

        report
    }

    pub async fn run_all(&self, source: &dyn SubjectSource, plan_date: Date) -> Result<BatchReport> {
        let subjects = source.subjects().await?;

        Ok(self.run(subjects, plan_date).await)
    }
}
