use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use nutriplan_shared::mealplan::{MealType, SubjectKey, UsageRecord};
use nutriplan_shared::{Error, Result};
use time::Date;

use crate::UsageHistoryStore;

pub const DEFAULT_DEDUP_WINDOW_DAYS: u32 = 30;
pub const RETENTION_DAYS: u32 = 90;

const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Recent usage per subject, driving recipe variety and retention.
///
/// A record dated `used_date` counts toward a window of `n` days when
/// `0 <= today - used_date < n`, so a window of 0 disables deduplication.
#[derive(Clone)]
pub struct UsageHistoryLedger {
    store: Arc<dyn UsageHistoryStore>,
    retention_days: u32,
}

impl UsageHistoryLedger {
    pub fn new(store: Arc<dyn UsageHistoryStore>) -> Self {
        Self {
            store,
            retention_days: RETENTION_DAYS,
        }
    }

    pub fn retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    pub fn store(&self) -> &Arc<dyn UsageHistoryStore> {
        &self.store
    }

    /// Inclusive date range covered by `window_days`, clamped to retention.
    fn window(&self, today: Date, window_days: u32) -> Option<(Date, Date)> {
        let days = window_days.min(self.retention_days);
        if days == 0 {
            return None;
        }

        let from = today.checked_sub(time::Duration::days(i64::from(days) - 1))?;

        Some((from, today))
    }

    pub async fn was_recently_used(
        &self,
        subject: &SubjectKey,
        recipe_identifier: &str,
        today: Date,
    ) -> Result<bool> {
        self.was_recently_used_within(
            subject,
            recipe_identifier,
            today,
            DEFAULT_DEDUP_WINDOW_DAYS,
        )
        .await
    }

    pub async fn was_recently_used_within(
        &self,
        subject: &SubjectKey,
        recipe_identifier: &str,
        today: Date,
        window_days: u32,
    ) -> Result<bool> {
        let Some((from, to)) = self.window(today, window_days) else {
            return Ok(false);
        };

        Ok(self.store.find(subject, recipe_identifier, from, to).await?)
    }

    /// Everything the subject used within the retention window, for selection without
    /// further store round-trips.
    pub async fn snapshot(&self, subject: &SubjectKey, today: Date) -> Result<UsageSnapshot> {
        let records = match self.window(today, self.retention_days) {
            Some((from, to)) => self.store.list(subject, from, to).await?,
            None => Vec::new(),
        };

        Ok(UsageSnapshot {
            today,
            retention_days: self.retention_days,
            records,
        })
    }

    /// Snapshot for planning `plan_date`. Records dated `plan_date` are left out since
    /// the run overwrites them, which keeps a replan of the same day stable.
    pub async fn plan_snapshot(
        &self,
        subject: &SubjectKey,
        plan_date: Date,
    ) -> Result<UsageSnapshot> {
        let mut snapshot = self.snapshot(subject, plan_date).await?;
        snapshot.records.retain(|r| r.used_date != plan_date);

        Ok(snapshot)
    }

    /// Idempotent per (subject, meal type, day): a second call overwrites the first.
    pub async fn record(
        &self,
        subject: &SubjectKey,
        recipe_identifier: &str,
        meal_type: MealType,
        used_date: Date,
    ) -> Result<()> {
        let record = UsageRecord {
            subject_key: subject.clone(),
            recipe_identifier: recipe_identifier.to_owned(),
            meal_type,
            used_date,
        };

        self.store
            .upsert(&record)
            .await
            .map_err(|err| Error::LedgerWrite(err.to_string()))
    }

    pub async fn record_with_retry(
        &self,
        subject: &SubjectKey,
        recipe_identifier: &str,
        meal_type: MealType,
        used_date: Date,
        attempts: u32,
    ) -> Result<()> {
        let attempts = attempts.max(1);
        let mut attempt = 1;

        loop {
            match self
                .record(subject, recipe_identifier, meal_type, used_date)
                .await
            {
                Ok(()) => return Ok(()),
                Err(err) if attempt >= attempts => return Err(err),
                Err(err) => {
                    tracing::debug!(
                        subject = %subject,
                        meal_type = %meal_type,
                        attempt,
                        err = %err,
                        "retrying usage record write"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Delete records older than the retention window relative to `today`.
    pub async fn purge_older_than(&self, today: Date) -> Result<u64> {
        let cutoff = today
            .checked_sub(time::Duration::days(i64::from(self.retention_days)))
            .unwrap_or(Date::MIN);

        let purged = self.store.purge_before(cutoff).await?;
        tracing::info!(cutoff = %cutoff, purged, "usage records purged");

        Ok(purged)
    }
}

/// Usage records of one subject read once before its slots are selected.
#[derive(Clone, Debug, PartialEq)]
pub struct UsageSnapshot {
    today: Date,
    retention_days: u32,
    records: Vec<UsageRecord>,
}

impl UsageSnapshot {
    pub fn empty(today: Date) -> Self {
        Self {
            today,
            retention_days: RETENTION_DAYS,
            records: Vec::new(),
        }
    }

    pub fn today(&self) -> Date {
        self.today
    }

    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    fn counts(&self, record: &UsageRecord, window_days: u32) -> bool {
        let age = (self.today - record.used_date).whole_days();

        age >= 0 && age < i64::from(window_days.min(self.retention_days))
    }

    pub fn was_recently_used(&self, recipe_identifier: &str, window_days: u32) -> bool {
        self.records
            .iter()
            .any(|r| r.recipe_identifier == recipe_identifier && self.counts(r, window_days))
    }

    pub fn recently_used(&self, window_days: u32) -> BTreeSet<&str> {
        self.records
            .iter()
            .filter(|r| self.counts(r, window_days))
            .map(|r| r.recipe_identifier.as_str())
            .collect()
    }
}
