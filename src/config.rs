use std::env;
use std::time::Duration;

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use nutriplan_mealplan::{PlannerSettings, ScheduleSettings, ScoringWeights};
use nutriplan_nutrition::{ConditionNutritionRule, ConditionRuleCatalog, NutritionError};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub scoring: ScoringWeights,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Replace or extend built-in condition rules, keyed by condition code
    #[serde(default)]
    pub conditions: Vec<ConditionNutritionRule>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlannerConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
    #[serde(default = "default_ledger_write_attempts")]
    pub ledger_write_attempts: u32,
    #[serde(default = "default_dedup_window_days")]
    pub dedup_window_days: u32,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            provider_timeout_ms: default_provider_timeout_ms(),
            ledger_write_attempts: default_ledger_write_attempts(),
            dedup_window_days: default_dedup_window_days(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_concurrency() -> usize {
    8
}

fn default_provider_timeout_ms() -> u64 {
    5000
}

fn default_ledger_write_attempts() -> u32 {
    3
}

fn default_dedup_window_days() -> u32 {
    nutriplan_mealplan::DEFAULT_DEDUP_WINDOW_DAYS
}

fn default_retention_days() -> u32 {
    nutriplan_mealplan::RETENTION_DAYS
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// Six-field cron expression (with seconds)
    #[serde(default = "default_plan_cron")]
    pub plan_cron: String,
    #[serde(default = "default_purge_cron")]
    pub purge_cron: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            plan_cron: default_plan_cron(),
            purge_cron: default_purge_cron(),
        }
    }
}

fn default_plan_cron() -> String {
    "0 0 4 * * *".to_string()
}

fn default_purge_cron() -> String {
    "0 30 3 * * *".to_string()
}

impl Config {
    /// Load configuration from file and environment variables
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (NUTRIPLAN__DATABASE__URL, etc.)
    /// 2. Config file specified by path, `CONFIG_PATH`, or `config/default.toml`
    /// 3. Hardcoded defaults
    pub fn load(config_path: Option<String>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder()
            .set_default("database.url", "sqlite:nutriplan.db")?
            .set_default("database.max_connections", 5)?;

        let config_file_path = config_path
            .or_else(|| env::var("CONFIG_PATH").ok())
            .unwrap_or_else(|| "config/default.toml".to_string());

        if std::path::Path::new(&config_file_path).exists() {
            builder = builder.add_source(File::with_name(&config_file_path));
        }

        builder = builder.add_source(
            Environment::with_prefix("NUTRIPLAN")
                .separator("__")
                .try_parsing(true),
        );

        if let Ok(database_url) = env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", database_url)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections < 1 {
            return Err("Database max_connections must be at least 1".to_string());
        }
        if self.planner.concurrency < 1 {
            return Err("Planner concurrency must be at least 1".to_string());
        }
        if self.planner.provider_timeout_ms == 0 {
            return Err("Planner provider_timeout_ms must be greater than 0".to_string());
        }
        if self.planner.ledger_write_attempts < 1 {
            return Err("Planner ledger_write_attempts must be at least 1".to_string());
        }

        let weights = &self.scoring;
        for (name, value) in [
            ("calorie_weight", weights.calorie_weight),
            ("macro_weight", weights.macro_weight),
            ("cap_penalty", weights.cap_penalty),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("Scoring {name} must be a non-negative number"));
            }
        }

        self.catalog().map_err(|e| e.to_string())?;

        Ok(())
    }

    /// Built-in condition rules with configured entries applied on top.
    pub fn catalog(&self) -> Result<ConditionRuleCatalog, NutritionError> {
        ConditionRuleCatalog::builtin().with_overrides(self.conditions.iter().cloned())
    }

    pub fn planner_settings(&self) -> PlannerSettings {
        PlannerSettings {
            concurrency: self.planner.concurrency,
            provider_timeout: Duration::from_millis(self.planner.provider_timeout_ms),
            ledger_write_attempts: self.planner.ledger_write_attempts,
            dedup_window_days: self.planner.dedup_window_days,
            retention_days: self.planner.retention_days,
            weights: self.scoring,
        }
    }

    pub fn schedule_settings(&self) -> ScheduleSettings {
        ScheduleSettings {
            plan_cron: self.scheduler.plan_cron.to_owned(),
            purge_cron: self.scheduler.purge_cron.to_owned(),
        }
    }
}
