use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use nutriplan_shared::mealplan::{MealType, SubjectKey, UsageRecord};
use nutriplan_shared::recipe::RecipeCandidate;
use nutriplan_shared::user::HealthProfile;
use time::Date;
use tokio::sync::RwLock;

use crate::MealPlan;

/// Hints for the recipe source. The engine enforces exclusions itself regardless.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SoftPreferences {
    pub calorie_target: u32,
    pub preferred_tags: BTreeSet<String>,
    pub avoid_tags: BTreeSet<String>,
}

#[async_trait::async_trait]
pub trait HealthProfileProvider: Send + Sync {
    /// A subject without a stored profile yields `HealthProfile::default()`.
    async fn profile(&self, subject: &SubjectKey) -> anyhow::Result<HealthProfile>;
}

#[async_trait::async_trait]
pub trait CandidatePoolProvider: Send + Sync {
    async fn fetch(
        &self,
        meal_type: MealType,
        preferences: &SoftPreferences,
    ) -> anyhow::Result<Vec<RecipeCandidate>>;
}

#[async_trait::async_trait]
pub trait UsageHistoryStore: Send + Sync {
    /// Whether the subject used the recipe on any day in `from..=to`.
    async fn find(
        &self,
        subject: &SubjectKey,
        recipe_identifier: &str,
        from: Date,
        to: Date,
    ) -> anyhow::Result<bool>;

    /// Every record of the subject dated in `from..=to`.
    async fn list(&self, subject: &SubjectKey, from: Date, to: Date)
    -> anyhow::Result<Vec<UsageRecord>>;

    /// Insert or replace the record keyed by (subject, meal type, day).
    async fn upsert(&self, record: &UsageRecord) -> anyhow::Result<()>;

    /// Delete records dated strictly before `cutoff`, returning how many were removed.
    async fn purge_before(&self, cutoff: Date) -> anyhow::Result<u64>;
}

#[async_trait::async_trait]
pub trait PlanPersister: Send + Sync {
    async fn persist(&self, plan: &MealPlan) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
pub trait SubjectSource: Send + Sync {
    async fn subjects(&self) -> anyhow::Result<Vec<SubjectKey>>;
}

#[derive(Clone, Default)]
pub struct StaticProfiles {
    profiles: HashMap<SubjectKey, HealthProfile>,
}

impl StaticProfiles {
    pub fn new(profiles: impl IntoIterator<Item = (SubjectKey, HealthProfile)>) -> Self {
        Self {
            profiles: profiles.into_iter().collect(),
        }
    }
}

#[async_trait::async_trait]
impl HealthProfileProvider for StaticProfiles {
    async fn profile(&self, subject: &SubjectKey) -> anyhow::Result<HealthProfile> {
        Ok(self.profiles.get(subject).cloned().unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl SubjectSource for StaticProfiles {
    async fn subjects(&self) -> anyhow::Result<Vec<SubjectKey>> {
        let mut subjects = self.profiles.keys().cloned().collect::<Vec<_>>();
        subjects.sort();

        Ok(subjects)
    }
}

/// Fixed candidate pool per meal type; soft preferences are ignored.
#[derive(Clone, Default)]
pub struct StaticCandidatePool {
    pools: BTreeMap<MealType, Vec<RecipeCandidate>>,
}

impl StaticCandidatePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, meal_type: MealType, candidates: Vec<RecipeCandidate>) -> Self {
        self.pools.entry(meal_type).or_default().extend(candidates);
        self
    }
}

#[async_trait::async_trait]
impl CandidatePoolProvider for StaticCandidatePool {
    async fn fetch(
        &self,
        meal_type: MealType,
        _preferences: &SoftPreferences,
    ) -> anyhow::Result<Vec<RecipeCandidate>> {
        Ok(self.pools.get(&meal_type).cloned().unwrap_or_default())
    }
}

type UsageKey = (String, MealType, Date);

#[derive(Clone, Default)]
pub struct MemoryUsageStore {
    records: Arc<RwLock<BTreeMap<UsageKey, UsageRecord>>>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl UsageHistoryStore for MemoryUsageStore {
    async fn find(
        &self,
        subject: &SubjectKey,
        recipe_identifier: &str,
        from: Date,
        to: Date,
    ) -> anyhow::Result<bool> {
        let records = self.records.read().await;

        Ok(records.values().any(|r| {
            &r.subject_key == subject
                && r.recipe_identifier == recipe_identifier
                && r.used_date >= from
                && r.used_date <= to
        }))
    }

    async fn list(
        &self,
        subject: &SubjectKey,
        from: Date,
        to: Date,
    ) -> anyhow::Result<Vec<UsageRecord>> {
        let records = self.records.read().await;

        Ok(records
            .values()
            .filter(|r| &r.subject_key == subject && r.used_date >= from && r.used_date <= to)
            .cloned()
            .collect())
    }

    async fn upsert(&self, record: &UsageRecord) -> anyhow::Result<()> {
        let key = (
            record.subject_key.storage_key(),
            record.meal_type,
            record.used_date,
        );
        self.records.write().await.insert(key, record.clone());

        Ok(())
    }

    async fn purge_before(&self, cutoff: Date) -> anyhow::Result<u64> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| r.used_date >= cutoff);

        Ok((before - records.len()) as u64)
    }
}

#[derive(Clone, Default)]
pub struct MemoryPlanPersister {
    plans: Arc<RwLock<BTreeMap<(String, Date), MealPlan>>>,
}

impl MemoryPlanPersister {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, subject: &SubjectKey, plan_date: Date) -> Option<MealPlan> {
        self.plans
            .read()
            .await
            .get(&(subject.storage_key(), plan_date))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.plans.read().await.len()
    }
}

#[async_trait::async_trait]
impl PlanPersister for MemoryPlanPersister {
    async fn persist(&self, plan: &MealPlan) -> anyhow::Result<()> {
        self.plans
            .write()
            .await
            .insert((plan.subject.storage_key(), plan.plan_date), plan.clone());

        Ok(())
    }
}
