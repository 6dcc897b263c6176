use std::str::FromStr;

use sqlx::{SqlitePool, sqlite::SqliteConnectOptions};
use sqlx_migrator::migrator::{Migrate, Plan};
use temp_dir::TempDir;

async fn tables(pool: &SqlitePool) -> anyhow::Result<Vec<String>> {
    let names = sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE '\\_%' ESCAPE '\\' AND name NOT LIKE 'sqlite%' ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(names)
}

#[tokio::test]
async fn apply_and_revert_all() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.child("db.sqlite3");
    let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;
    let mut conn = pool.acquire().await?;
    let migrator = nutriplan_db::migrator::<sqlx::Sqlite>()?;

    migrator.run(&mut conn, &Plan::apply_all()).await?;

    assert_eq!(
        tables(&pool).await?,
        vec![
            "health_profile",
            "meal_plan_slot",
            "recipe_candidate",
            "usage_record"
        ]
    );

    let index = sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type = 'index' AND name = 'idx_usage_record_recipe'",
    )
    .fetch_optional(&pool)
    .await?;
    assert!(index.is_some());

    // applying twice is a no-op
    migrator.run(&mut conn, &Plan::apply_all()).await?;

    migrator.run(&mut conn, &Plan::revert_all()).await?;
    assert!(tables(&pool).await?.is_empty());

    Ok(())
}
