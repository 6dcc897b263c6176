use std::{path::PathBuf, str::FromStr};

use nutriplan_shared::recipe::{NutritionFacts, RecipeCandidate};
use sqlx::{SqlitePool, sqlite::SqliteConnectOptions};
use sqlx_migrator::migrator::{Migrate, Plan};

#[allow(dead_code)]
pub async fn setup_test_pool(path: PathBuf) -> anyhow::Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.to_str().unwrap()))?
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;
    let mut conn = pool.acquire().await?;
    nutriplan_db::migrator::<sqlx::Sqlite>()?
        .run(&mut conn, &Plan::apply_all())
        .await?;

    Ok(pool)
}

#[allow(dead_code)]
pub fn recipe(id: &str, title: &str, calories: f64, tags: &[&str]) -> RecipeCandidate {
    RecipeCandidate {
        id: Some(id.to_owned()),
        title: title.to_owned(),
        nutrition: NutritionFacts {
            calories: Some(calories),
            ..Default::default()
        },
        ingredient_tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}
