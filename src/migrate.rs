use std::str::FromStr;

use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Sqlite, SqlitePool};
use sqlx_migrator::migrator::{Migrate, Plan};

use crate::Config;

/// Create the database when missing and apply every pending migration.
#[tracing::instrument(skip(config))]
pub async fn migrate(config: &Config) -> anyhow::Result<()> {
    let options = SqliteConnectOptions::from_str(&config.database.url)?.create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;

    apply(&pool).await?;
    pool.close().await;

    tracing::info!("migrations completed");

    Ok(())
}

/// Drop the database if it exists, then migrate from scratch.
#[tracing::instrument(skip(config))]
pub async fn reset(config: &Config) -> anyhow::Result<()> {
    if Sqlite::database_exists(&config.database.url).await? {
        tracing::warn!(url = %config.database.url, "dropping database");
        Sqlite::drop_database(&config.database.url).await?;
    }

    migrate(config).await
}

pub async fn apply(pool: &SqlitePool) -> anyhow::Result<()> {
    let mut conn = pool.acquire().await?;
    nutriplan_db::migrator::<Sqlite>()?
        .run(&mut conn, &Plan::apply_all())
        .await?;

    Ok(())
}
