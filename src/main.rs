use anyhow::Result;
use clap::{Parser, Subcommand};
use nutriplan::{Config, Planning};
use time::{Date, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// nutriplan - health-aware daily meal planning
#[derive(Parser)]
#[command(name = "nutriplan")]
#[command(about = "Health-condition-aware daily meal planning", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Drop database if exists and recreate with migrations
    Reset,
    /// Generate plans for every subject with a stored health profile
    Plan {
        /// Plan date (YYYY-MM-DD), defaults to today (UTC)
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,
    },
    /// Delete usage records older than the retention window
    Purge {
        /// Reference date (YYYY-MM-DD), defaults to today (UTC)
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,
    },
    /// Run planning and purging on their cron schedules until interrupted
    Schedule,
}

fn parse_date(value: &str) -> Result<Date, String> {
    Date::parse(value, DATE_FORMAT).map_err(|e| format!("invalid date `{value}`: {e}"))
}

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.clone())?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    nutriplan::observability::init_observability(
        "nutriplan",
        env!("CARGO_PKG_VERSION"),
        &config.observability.log_level,
    )?;

    match cli.command {
        Commands::Migrate => nutriplan::migrate::migrate(&config).await,
        Commands::Reset => nutriplan::migrate::reset(&config).await,
        Commands::Plan { date } => plan_command(config, date.unwrap_or_else(today)).await,
        Commands::Purge { date } => purge_command(config, date.unwrap_or_else(today)).await,
        Commands::Schedule => schedule_command(config).await,
    }
}

async fn planning(config: &Config) -> Result<Planning> {
    let pool =
        nutriplan::db::create_pool(&config.database.url, config.database.max_connections).await?;

    Planning::new(pool, config)
}

#[tracing::instrument(skip(config))]
async fn plan_command(config: Config, plan_date: Date) -> Result<()> {
    let report = planning(&config).await?.plan(plan_date).await?;

    for (subject, reason) in &report.failed {
        tracing::warn!(subject = %subject, reason = %reason, "subject not planned");
    }

    if !report.is_success() {
        anyhow::bail!(
            "{} of {} subjects failed",
            report.failed.len(),
            report.failed.len() + report.planned.len()
        );
    }

    Ok(())
}

#[tracing::instrument(skip(config))]
async fn purge_command(config: Config, today: Date) -> Result<()> {
    let purged = planning(&config).await?.purge(today).await?;

    tracing::info!(purged, "purge completed");

    Ok(())
}

#[tracing::instrument(skip(config))]
async fn schedule_command(config: Config) -> Result<()> {
    let planning = planning(&config).await?;
    let mut sched = planning.scheduler(&config).await?;

    sched.start().await?;
    tracing::info!(
        plan_cron = %config.scheduler.plan_cron,
        purge_cron = %config.scheduler.purge_cron,
        "scheduler started"
    );

    tokio::signal::ctrl_c().await?;
    sched.shutdown().await?;

    Ok(())
}
