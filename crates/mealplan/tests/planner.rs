use std::sync::Arc;
use std::time::Duration;

use nutriplan_mealplan::{
    BatchPlanner, CandidatePoolProvider, HealthProfileProvider, MealPlan, MealPlanner,
    MemoryPlanPersister, MemoryUsageStore, PlanPersister, PlannerSettings, SoftPreferences,
    StaticCandidatePool, StaticProfiles, UsageHistoryLedger, UsageHistoryStore,
};
use nutriplan_nutrition::ConditionRuleCatalog;
use nutriplan_shared::Error;
use nutriplan_shared::mealplan::{MealType, SubjectKey, UsageRecord};
use nutriplan_shared::recipe::RecipeCandidate;
use nutriplan_shared::user::{ActivityLevel, Gender, HealthProfile};
use time::{Date, macros::date};

use crate::helpers::recipe;

mod helpers;

fn pool() -> StaticCandidatePool {
    StaticCandidatePool::new()
        .with(
            MealType::Breakfast,
            vec![
                recipe("oats", "Overnight oats", 520.0, &["oat", "whole grain"]),
                recipe("toast", "Peanut toast", 500.0, &["peanut", "bread"]),
                recipe("eggs", "Spinach omelette", 430.0, &["egg", "leafy_green"]),
            ],
        )
        .with(
            MealType::Lunch,
            vec![
                recipe("dal", "Lentil dal", 610.0, &["legume"]),
                recipe("wrap", "Ham wrap", 600.0, &["cured_meat", "bread"]),
            ],
        )
        .with(
            MealType::Dinner,
            vec![
                recipe("salmon", "Baked salmon", 540.0, &["oily_fish"]),
                recipe("pasta", "Cream pasta", 700.0, &["pasta"]),
            ],
        )
        .with(
            MealType::Snack,
            vec![
                recipe("apple", "Apple slices", 90.0, &["fruit"]),
                recipe("nuts", "Mixed nuts", 180.0, &["peanut"]),
            ],
        )
}

fn john() -> (SubjectKey, HealthProfile) {
    (
        SubjectKey::user("john"),
        HealthProfile {
            age: Some(52),
            gender: Some(Gender::Male),
            weight_kg: Some(82.0),
            height_cm: Some(176.0),
            activity_level: Some(ActivityLevel::Light),
            diseases: ["hypertension".to_owned(), "diabetes".to_owned()].into(),
            allergies: ["peanut".to_owned()].into(),
            daily_calorie_goal_override: None,
        },
    )
}

fn planner(
    profiles: Arc<dyn HealthProfileProvider>,
    candidates: Arc<dyn CandidatePoolProvider>,
    store: Arc<dyn UsageHistoryStore>,
    persister: Arc<dyn PlanPersister>,
) -> MealPlanner {
    MealPlanner::new(
        Arc::new(ConditionRuleCatalog::builtin()),
        profiles,
        candidates,
        UsageHistoryLedger::new(store),
        persister,
    )
}

#[tokio::test]
async fn plans_all_slots_and_records_usage() -> anyhow::Result<()> {
    let store = Arc::new(MemoryUsageStore::new());
    let persister = Arc::new(MemoryPlanPersister::new());
    let (subject, profile) = john();
    let planner = planner(
        Arc::new(StaticProfiles::new([(subject.clone(), profile)])),
        Arc::new(pool()),
        store.clone(),
        persister.clone(),
    );
    let day = date!(2026 - 05 - 04);

    let plan = planner.plan_subject(&subject, day).await?;

    let picked = plan
        .meals
        .iter()
        .map(|m| (m.slot.meal_type, m.selection.identifier.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        picked,
        vec![
            (MealType::Breakfast, "oats"),
            (MealType::Lunch, "dal"),
            (MealType::Dinner, "salmon"),
            (MealType::Snack, "apple"),
        ]
    );

    for meal in &plan.meals {
        assert!(
            meal.selection
                .candidate
                .normalized_tags()
                .is_disjoint(&plan.target.excluded_ingredients)
        );
        assert_eq!(meal.rationale.recipe_identifier, meal.selection.identifier);
    }

    assert_eq!(store.len().await, 4);
    assert_eq!(persister.get(&subject, day).await, Some(plan));

    Ok(())
}

#[tokio::test]
async fn next_day_avoids_yesterdays_breakfast() -> anyhow::Result<()> {
    let store = Arc::new(MemoryUsageStore::new());
    let (subject, profile) = john();
    let planner = planner(
        Arc::new(StaticProfiles::new([(subject.clone(), profile)])),
        Arc::new(pool()),
        store,
        Arc::new(MemoryPlanPersister::new()),
    );

    let first = planner.plan_subject(&subject, date!(2026 - 05 - 04)).await?;
    let second = planner.plan_subject(&subject, date!(2026 - 05 - 05)).await?;

    assert_eq!(first.meals[0].selection.identifier, "oats");
    assert_eq!(second.meals[0].selection.identifier, "eggs");
    assert_eq!(second.meals[0].window_days, 30);

    assert_eq!(second.meals[2].selection.identifier, "pasta");
    // dal is the only lunch without cured meat
    assert_eq!(second.meals[1].selection.identifier, "dal");
    assert_eq!(second.meals[1].window_days, 0);

    Ok(())
}

#[tokio::test]
async fn replanning_the_same_day_keeps_the_picks() -> anyhow::Result<()> {
    let store = Arc::new(MemoryUsageStore::new());
    let persister = Arc::new(MemoryPlanPersister::new());
    let (subject, profile) = john();
    let planner = planner(
        Arc::new(StaticProfiles::new([(subject.clone(), profile)])),
        Arc::new(pool()),
        store.clone(),
        persister.clone(),
    );
    let day = date!(2026 - 05 - 04);

    let picks = |plan: &MealPlan| {
        plan.meals
            .iter()
            .map(|m| (m.selection.identifier.clone(), m.window_days))
            .collect::<Vec<_>>()
    };

    let first = planner.plan_subject(&subject, day).await?;
    let second = planner.plan_subject(&subject, day).await?;

    assert_eq!(picks(&first), picks(&second));
    assert_eq!(
        picks(&second),
        vec![
            ("oats".to_owned(), 30),
            ("dal".to_owned(), 30),
            ("salmon".to_owned(), 30),
            ("apple".to_owned(), 30),
        ]
    );
    assert_eq!(store.len().await, 4);
    assert_eq!(persister.get(&subject, day).await, Some(second));

    Ok(())
}

#[tokio::test]
async fn identical_inputs_give_identical_plans() -> anyhow::Result<()> {
    let (subject, profile) = john();
    let day = date!(2026 - 05 - 04);
    let mut plans = vec![];

    for _ in 0..2 {
        let planner = planner(
            Arc::new(StaticProfiles::new([(subject.clone(), profile.clone())])),
            Arc::new(pool()),
            Arc::new(MemoryUsageStore::new()),
            Arc::new(MemoryPlanPersister::new()),
        );
        plans.push(planner.plan_subject(&subject, day).await?);
    }

    assert_eq!(plans[0], plans[1]);
    for (a, b) in plans[0].meals.iter().zip(&plans[1].meals) {
        assert_eq!(a.rationale.text(), b.rationale.text());
    }

    Ok(())
}

#[tokio::test]
async fn empty_slot_fails_the_subject() -> anyhow::Result<()> {
    let (subject, profile) = john();
    let candidates = StaticCandidatePool::new()
        .with(MealType::Breakfast, vec![recipe("oats", "Oats", 500.0, &[])])
        .with(MealType::Lunch, vec![recipe("dal", "Dal", 600.0, &[])])
        .with(MealType::Dinner, vec![recipe("stew", "Stew", 600.0, &[])]);
    let persister = Arc::new(MemoryPlanPersister::new());
    let planner = planner(
        Arc::new(StaticProfiles::new([(subject.clone(), profile)])),
        Arc::new(candidates),
        Arc::new(MemoryUsageStore::new()),
        persister.clone(),
    );

    let err = planner
        .plan_subject(&subject, date!(2026 - 05 - 04))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::NoEligibleRecipe {
            meal_type: MealType::Snack,
            ..
        }
    ));
    assert_eq!(persister.len().await, 0);

    Ok(())
}

struct SlowPool;

#[async_trait::async_trait]
impl CandidatePoolProvider for SlowPool {
    async fn fetch(
        &self,
        _meal_type: MealType,
        _preferences: &SoftPreferences,
    ) -> anyhow::Result<Vec<RecipeCandidate>> {
        tokio::time::sleep(Duration::from_millis(500)).await;

        Ok(vec![])
    }
}

#[tokio::test]
async fn slow_pool_times_out() -> anyhow::Result<()> {
    let (subject, profile) = john();
    let planner = planner(
        Arc::new(StaticProfiles::new([(subject.clone(), profile)])),
        Arc::new(SlowPool),
        Arc::new(MemoryUsageStore::new()),
        Arc::new(MemoryPlanPersister::new()),
    )
    .settings(PlannerSettings {
        provider_timeout: Duration::from_millis(20),
        ..Default::default()
    });

    let err = planner
        .plan_subject(&subject, date!(2026 - 05 - 04))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Timeout {
            operation: "candidate fetch",
            ..
        }
    ));

    Ok(())
}

struct BrokenUsageStore {
    inner: MemoryUsageStore,
}

#[async_trait::async_trait]
impl UsageHistoryStore for BrokenUsageStore {
    async fn find(
        &self,
        subject: &SubjectKey,
        recipe_identifier: &str,
        from: Date,
        to: Date,
    ) -> anyhow::Result<bool> {
        self.inner.find(subject, recipe_identifier, from, to).await
    }

    async fn list(
        &self,
        subject: &SubjectKey,
        from: Date,
        to: Date,
    ) -> anyhow::Result<Vec<UsageRecord>> {
        self.inner.list(subject, from, to).await
    }

    async fn upsert(&self, _record: &UsageRecord) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }

    async fn purge_before(&self, cutoff: Date) -> anyhow::Result<u64> {
        self.inner.purge_before(cutoff).await
    }
}

#[tokio::test]
async fn ledger_write_failure_keeps_the_plan() -> anyhow::Result<()> {
    let (subject, profile) = john();
    let persister = Arc::new(MemoryPlanPersister::new());
    let planner = planner(
        Arc::new(StaticProfiles::new([(subject.clone(), profile)])),
        Arc::new(pool()),
        Arc::new(BrokenUsageStore {
            inner: MemoryUsageStore::new(),
        }),
        persister.clone(),
    )
    .settings(PlannerSettings {
        ledger_write_attempts: 2,
        ..Default::default()
    });

    let plan = planner
        .plan_subject(&subject, date!(2026 - 05 - 04))
        .await?;

    assert_eq!(plan.meals.len(), 4);
    assert_eq!(persister.len().await, 1);

    Ok(())
}

struct FailingPersister;

#[async_trait::async_trait]
impl PlanPersister for FailingPersister {
    async fn persist(&self, _plan: &MealPlan) -> anyhow::Result<()> {
        anyhow::bail!("plan store unavailable")
    }
}

#[tokio::test]
async fn failed_persist_leaves_no_usage() -> anyhow::Result<()> {
    let store = Arc::new(MemoryUsageStore::new());
    let (subject, profile) = john();
    let planner = planner(
        Arc::new(StaticProfiles::new([(subject.clone(), profile)])),
        Arc::new(pool()),
        store.clone(),
        Arc::new(FailingPersister),
    );

    let err = planner
        .plan_subject(&subject, date!(2026 - 05 - 04))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("plan store unavailable"));
    assert_eq!(store.len().await, 0);

    Ok(())
}

struct FlakyProfiles {
    inner: StaticProfiles,
    broken: SubjectKey,
}

#[async_trait::async_trait]
impl HealthProfileProvider for FlakyProfiles {
    async fn profile(&self, subject: &SubjectKey) -> anyhow::Result<HealthProfile> {
        if subject == &self.broken {
            anyhow::bail!("profile store unavailable");
        }

        self.inner.profile(subject).await
    }
}

#[tokio::test]
async fn batch_isolates_failing_subjects() -> anyhow::Result<()> {
    let (john, profile) = john();
    let emma = SubjectKey::member("john", "emma");
    let ann = SubjectKey::user("ann");
    let persister = Arc::new(MemoryPlanPersister::new());
    let profiles = FlakyProfiles {
        inner: StaticProfiles::new([(john.clone(), profile)]),
        broken: emma.clone(),
    };
    let planner = planner(
        Arc::new(profiles),
        Arc::new(pool()),
        Arc::new(MemoryUsageStore::new()),
        persister.clone(),
    );

    let report = BatchPlanner::new(Arc::new(planner))
        .run(
            vec![john.clone(), emma.clone(), ann.clone()],
            date!(2026 - 05 - 04),
        )
        .await;

    assert!(!report.is_success());
    assert_eq!(report.planned, vec![ann, john]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, emma);
    assert!(report.failed[0].1.contains("profile store unavailable"));
    assert_eq!(persister.len().await, 2);

    Ok(())
}
