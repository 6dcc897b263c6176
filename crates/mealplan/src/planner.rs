use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bitcode::{Decode, Encode};
use nutriplan_nutrition::{
    ConditionAggregator, ConditionRuleCatalog, MealAllocator, MealSlotTarget,
    NutritionTargetProfile,
};
use nutriplan_shared::mealplan::SubjectKey;
use nutriplan_shared::{Error, Result};
use time::Date;

use crate::{
    CandidatePoolProvider, DEFAULT_DEDUP_WINDOW_DAYS, HealthProfileProvider, PlanPersister,
    RETENTION_DAYS, RecipeScorer, RecipeSelector, ScoredCandidate, ScoringWeights,
    SelectionRationale, SelectionRationaleBuilder, SoftPreferences, UsageHistoryLedger,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlannerSettings {
    /// Subjects planned at once by [`crate::BatchPlanner`]
    pub concurrency: usize,
    pub provider_timeout: Duration,
    pub ledger_write_attempts: u32,
    pub dedup_window_days: u32,
    pub retention_days: u32,
    pub weights: ScoringWeights,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            concurrency: 8,
            provider_timeout: Duration::from_secs(5),
            ledger_write_attempts: 3,
            dedup_window_days: DEFAULT_DEDUP_WINDOW_DAYS,
            retention_days: RETENTION_DAYS,
            weights: ScoringWeights::default(),
        }
    }
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PlannedMeal {
    pub slot: MealSlotTarget,
    pub selection: ScoredCandidate,
    pub window_days: u32,
    pub rationale: SelectionRationale,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MealPlan {
    pub subject: SubjectKey,
    pub plan_date: Date,
    pub target: NutritionTargetProfile,
    /// Breakfast, lunch, dinner, snack
    pub meals: Vec<PlannedMeal>,
}

pub struct MealPlanner {
    catalog: Arc<ConditionRuleCatalog>,
    profiles: Arc<dyn HealthProfileProvider>,
    candidates: Arc<dyn CandidatePoolProvider>,
    ledger: UsageHistoryLedger,
    persister: Arc<dyn PlanPersister>,
    settings: PlannerSettings,
}

impl MealPlanner {
    pub fn new(
        catalog: Arc<ConditionRuleCatalog>,
        profiles: Arc<dyn HealthProfileProvider>,
        candidates: Arc<dyn CandidatePoolProvider>,
        ledger: UsageHistoryLedger,
        persister: Arc<dyn PlanPersister>,
    ) -> Self {
        Self {
            catalog,
            profiles,
            candidates,
            ledger,
            persister,
            settings: PlannerSettings::default(),
        }
    }

    pub fn settings(mut self, settings: PlannerSettings) -> Self {
        self.ledger = self.ledger.retention_days(settings.retention_days);
        self.settings = settings;
        self
    }

    pub fn planner_settings(&self) -> &PlannerSettings {
        &self.settings
    }

    pub fn ledger(&self) -> &UsageHistoryLedger {
        &self.ledger
    }

    /// Profile, aggregation, four concurrent slot selections, rationale, persistence and
    /// then serialized ledger writes for one subject.
    #[tracing::instrument(skip(self, subject), fields(subject = %subject))]
    pub async fn plan_subject(&self, subject: &SubjectKey, plan_date: Date) -> Result<MealPlan> {
        let timeout = self.settings.provider_timeout;
        let profile =
            with_timeout("profile fetch", timeout, self.profiles.profile(subject)).await?;

        let target = ConditionAggregator::new(&self.catalog).aggregate(&profile);
        let slots = MealAllocator::allocate(&target);
        let usage = self.ledger.plan_snapshot(subject, plan_date).await?;

        let scorer = RecipeScorer::new(&target, self.settings.weights);
        let selector = RecipeSelector::new(&scorer).window_days(self.settings.dedup_window_days);

        let selections = futures::future::try_join_all(slots.iter().map(|slot| {
            let selector = &selector;
            let usage = &usage;
            let preferences = SoftPreferences {
                calorie_target: slot.calorie_target,
                preferred_tags: target.preferred_ingredients.keys().cloned().collect(),
                avoid_tags: target.excluded_ingredients.clone(),
            };

            async move {
                let pool = with_timeout(
                    "candidate fetch",
                    timeout,
                    self.candidates.fetch(slot.meal_type, &preferences),
                )
                .await?;

                selector.select(slot, &pool, usage)
            }
        }))
        .await?;

        let meals = slots
            .into_iter()
            .zip(selections)
            .map(|(slot, selection)| {
                let rationale =
                    SelectionRationaleBuilder::build(&slot, &selection.chosen.candidate, &target);

                PlannedMeal {
                    slot,
                    selection: selection.chosen,
                    window_days: selection.window_days,
                    rationale,
                }
            })
            .collect();

        let plan = MealPlan {
            subject: subject.clone(),
            plan_date,
            target,
            meals,
        };

        with_timeout("plan persist", timeout, self.persister.persist(&plan)).await?;

        for meal in &plan.meals {
            if let Err(err) = self
                .ledger
                .record_with_retry(
                    subject,
                    &meal.selection.identifier,
                    meal.slot.meal_type,
                    plan_date,
                    self.settings.ledger_write_attempts,
                )
                .await
            {
                tracing::error!(meal_type = %meal.slot.meal_type, err = %err, "failed to record recipe usage");
            }
        }

        tracing::info!(plan_date = %plan_date, "meal plan generated");

        Ok(plan)
    }
}

pub(crate) async fn with_timeout<T>(
    operation: &'static str,
    after: Duration,
    fut: impl Future<Output = anyhow::Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(after, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(Error::Timeout { operation, after }),
    }
}
