use std::sync::Arc;

use nutriplan_mealplan::{
    CandidatePoolProvider, HealthProfileProvider, MealPlanner, SoftPreferences,
    SqliteCandidatePool, SqlitePlanPersister, SqliteProfileProvider, SqliteUsageStore,
    SubjectSource, UsageHistoryLedger, UsageHistoryStore,
};
use nutriplan_nutrition::ConditionRuleCatalog;
use nutriplan_shared::mealplan::{MealType, SubjectKey, UsageRecord};
use nutriplan_shared::user::{ActivityLevel, Gender, HealthProfile};
use temp_dir::TempDir;
use time::macros::date;

use crate::helpers::{recipe, setup_test_pool};

mod helpers;

fn usage(subject: &SubjectKey, recipe: &str, meal_type: MealType, used: time::Date) -> UsageRecord {
    UsageRecord {
        subject_key: subject.clone(),
        recipe_identifier: recipe.to_owned(),
        meal_type,
        used_date: used,
    }
}

#[tokio::test]
async fn usage_store_upserts_by_slot_and_day() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let pool = setup_test_pool(dir.child("db.sqlite3")).await?;
    let store = SqliteUsageStore::new(pool);
    let emma = SubjectKey::member("john", "emma");
    let day = date!(2026 - 04 - 02);

    store
        .upsert(&usage(&emma, "oats", MealType::Breakfast, day))
        .await?;
    store
        .upsert(&usage(&emma, "oats", MealType::Breakfast, day))
        .await?;
    store
        .upsert(&usage(&emma, "eggs", MealType::Breakfast, day))
        .await?;
    store
        .upsert(&usage(&emma, "stew", MealType::Dinner, date!(2026 - 03 - 30)))
        .await?;

    let records = store
        .list(&emma, date!(2026 - 03 - 01), date!(2026 - 04 - 30))
        .await?;

    assert_eq!(
        records,
        vec![
            usage(&emma, "eggs", MealType::Breakfast, day),
            usage(&emma, "stew", MealType::Dinner, date!(2026 - 03 - 30)),
        ]
    );
    assert!(store.find(&emma, "eggs", day, day).await?);
    assert!(!store.find(&emma, "oats", day, day).await?);
    assert!(
        !store
            .find(&SubjectKey::user("john"), "eggs", day, day)
            .await?
    );

    Ok(())
}

#[tokio::test]
async fn usage_store_separates_slash_ids_from_members() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let pool = setup_test_pool(dir.child("db.sqlite3")).await?;
    let store = SqliteUsageStore::new(pool);
    let slash_user = SubjectKey::user("a/b");
    let member = SubjectKey::member("a", "b");
    let day = date!(2026 - 04 - 02);

    store
        .upsert(&usage(&slash_user, "oats", MealType::Breakfast, day))
        .await?;
    store
        .upsert(&usage(&member, "eggs", MealType::Breakfast, day))
        .await?;

    assert_eq!(
        store.list(&slash_user, day, day).await?,
        vec![usage(&slash_user, "oats", MealType::Breakfast, day)]
    );
    assert_eq!(
        store.list(&member, day, day).await?,
        vec![usage(&member, "eggs", MealType::Breakfast, day)]
    );

    Ok(())
}

#[tokio::test]
async fn usage_store_purges_before_cutoff() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let pool = setup_test_pool(dir.child("db.sqlite3")).await?;
    let store = SqliteUsageStore::new(pool);
    let john = SubjectKey::user("john");

    store
        .upsert(&usage(&john, "oats", MealType::Breakfast, date!(2025 - 12 - 01)))
        .await?;
    store
        .upsert(&usage(&john, "dal", MealType::Lunch, date!(2026 - 01 - 01)))
        .await?;
    store
        .upsert(&usage(&john, "stew", MealType::Dinner, date!(2026 - 03 - 01)))
        .await?;

    assert_eq!(store.purge_before(date!(2026 - 01 - 01)).await?, 1);

    let remaining = store
        .list(&john, date!(2025 - 01 - 01), date!(2026 - 12 - 31))
        .await?;
    assert_eq!(remaining.len(), 2);

    Ok(())
}

#[tokio::test]
async fn ledger_purge_uses_retention() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let pool = setup_test_pool(dir.child("db.sqlite3")).await?;
    let ledger = UsageHistoryLedger::new(Arc::new(SqliteUsageStore::new(pool)));
    let john = SubjectKey::user("john");

    ledger
        .record(&john, "oats", MealType::Breakfast, date!(2026 - 01 - 01))
        .await?;
    ledger
        .record(&john, "stew", MealType::Dinner, date!(2026 - 03 - 20))
        .await?;

    // cutoff is 2026-01-05
    assert_eq!(ledger.purge_older_than(date!(2026 - 04 - 05)).await?, 1);
    assert!(
        ledger
            .was_recently_used(&john, "stew", date!(2026 - 04 - 05))
            .await?
    );

    Ok(())
}

#[tokio::test]
async fn profiles_round_trip_and_default() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let pool = setup_test_pool(dir.child("db.sqlite3")).await?;
    let profiles = SqliteProfileProvider::new(pool);
    let john = SubjectKey::user("john");
    let emma = SubjectKey::member("john", "emma");
    let profile = HealthProfile {
        age: Some(41),
        gender: Some(Gender::Female),
        weight_kg: Some(64.5),
        height_cm: Some(168.0),
        activity_level: Some(ActivityLevel::Active),
        diseases: ["celiac".to_owned()].into(),
        allergies: ["shellfish".to_owned()].into(),
        daily_calorie_goal_override: Some(1900.0),
    };

    profiles.save(&emma, &profile).await?;
    profiles.save(&john, &HealthProfile::default()).await?;

    assert_eq!(profiles.profile(&emma).await?, profile);
    assert_eq!(
        profiles.profile(&SubjectKey::user("ghost")).await?,
        HealthProfile::default()
    );
    assert_eq!(profiles.subjects().await?, vec![john, emma]);

    Ok(())
}

#[tokio::test]
async fn candidate_pool_is_scoped_by_meal_type() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let pool = setup_test_pool(dir.child("db.sqlite3")).await?;
    let candidates = SqliteCandidatePool::new(pool);

    candidates
        .save(MealType::Lunch, &recipe("b", "Bean chili", 550.0, &["legume"]))
        .await?;
    candidates
        .save(MealType::Lunch, &recipe("a", "Tuna salad", 450.0, &["fish"]))
        .await?;
    candidates
        .save(MealType::Lunch, &recipe("a", "Tuna salad", 480.0, &["fish"]))
        .await?;
    candidates
        .save(MealType::Snack, &recipe("c", "Apple", 90.0, &["fruit"]))
        .await?;

    let lunch = candidates
        .fetch(MealType::Lunch, &SoftPreferences::default())
        .await?;

    assert_eq!(
        lunch,
        vec![
            recipe("a", "Tuna salad", 480.0, &["fish"]),
            recipe("b", "Bean chili", 550.0, &["legume"]),
        ]
    );
    assert!(
        candidates
            .fetch(MealType::Dinner, &SoftPreferences::default())
            .await?
            .is_empty()
    );

    Ok(())
}

#[tokio::test]
async fn planner_persists_plan_rows() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let pool = setup_test_pool(dir.child("db.sqlite3")).await?;
    let profiles = Arc::new(SqliteProfileProvider::new(pool.clone()));
    let candidates = Arc::new(SqliteCandidatePool::new(pool.clone()));
    let store = Arc::new(SqliteUsageStore::new(pool.clone()));
    let persister = Arc::new(SqlitePlanPersister::new(pool));
    let john = SubjectKey::user("john");
    let day = date!(2026 - 04 - 06);

    profiles
        .save(
            &john,
            &HealthProfile {
                diseases: ["hypertension".to_owned()].into(),
                ..Default::default()
            },
        )
        .await?;
    for (meal_type, id, kcal, tags) in [
        (MealType::Breakfast, "oats", 600.0, &["oat"][..]),
        (MealType::Lunch, "ham", 700.0, &["cured_meat"][..]),
        (MealType::Lunch, "dal", 650.0, &["legume"][..]),
        (MealType::Dinner, "salmon", 600.0, &["oily_fish"][..]),
        (MealType::Snack, "apple", 100.0, &["fruit"][..]),
    ] {
        candidates
            .save(meal_type, &recipe(id, id, kcal, tags))
            .await?;
    }

    let planner = MealPlanner::new(
        Arc::new(ConditionRuleCatalog::builtin()),
        profiles,
        candidates,
        UsageHistoryLedger::new(store.clone()),
        persister.clone(),
    );

    let plan = planner.plan_subject(&john, day).await?;
    let stored = persister.load(&john, day).await?;

    assert_eq!(stored, plan.meals);
    assert_eq!(stored[1].selection.identifier, "dal");
    assert_eq!(store.list(&john, day, day).await?.len(), 4);

    // replanning the same day overwrites rows
    let again = planner.plan_subject(&john, day).await?;
    assert_eq!(persister.load(&john, day).await?, again.meals);

    Ok(())
}
