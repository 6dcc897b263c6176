use std::str::FromStr;

use nutriplan_db::table;
use nutriplan_shared::mealplan::{MealType, SubjectKey, UsageRecord};
use nutriplan_shared::recipe::RecipeCandidate;
use nutriplan_shared::user::HealthProfile;
use sea_query::{Expr, ExprTrait, OnConflict, Order, Query, SqliteQueryBuilder};
use sea_query_sqlx::SqlxBinder;
use sqlx::{SqlitePool, prelude::FromRow};
use time::{Date, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    CandidatePoolProvider, HealthProfileProvider, MealPlan, PlanPersister, PlannedMeal,
    SoftPreferences, SubjectSource, UsageHistoryStore,
};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

fn format_date(date: Date) -> anyhow::Result<String> {
    Ok(date.format(DATE_FORMAT)?)
}

fn parse_date(value: &str) -> anyhow::Result<Date> {
    Ok(Date::parse(value, DATE_FORMAT)?)
}

fn decode<T: bitcode::DecodeOwned>(payload: &[u8], what: &str) -> anyhow::Result<T> {
    bitcode::decode(payload).map_err(|err| anyhow::anyhow!("failed to decode {what}: {err}"))
}

#[derive(FromRow)]
struct UsageRow {
    recipe_identifier: String,
    meal_type: String,
    used_date: String,
}

#[derive(Clone)]
pub struct SqliteUsageStore {
    pool: SqlitePool,
}

impl SqliteUsageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UsageHistoryStore for SqliteUsageStore {
    async fn find(
        &self,
        subject: &SubjectKey,
        recipe_identifier: &str,
        from: Date,
        to: Date,
    ) -> anyhow::Result<bool> {
        let statement = Query::select()
            .columns([
                table::UsageRecord::RecipeIdentifier,
                table::UsageRecord::MealType,
                table::UsageRecord::UsedDate,
            ])
            .from(table::UsageRecord::Table)
            .and_where(Expr::col(table::UsageRecord::SubjectKey).eq(subject.storage_key()))
            .and_where(Expr::col(table::UsageRecord::RecipeIdentifier).eq(recipe_identifier))
            .and_where(Expr::col(table::UsageRecord::UsedDate).gte(format_date(from)?))
            .and_where(Expr::col(table::UsageRecord::UsedDate).lte(format_date(to)?))
            .limit(1)
            .to_owned();

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        let row = sqlx::query_as_with::<_, UsageRow, _>(&sql, values)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    async fn list(
        &self,
        subject: &SubjectKey,
        from: Date,
        to: Date,
    ) -> anyhow::Result<Vec<UsageRecord>> {
        let statement = Query::select()
            .columns([
                table::UsageRecord::RecipeIdentifier,
                table::UsageRecord::MealType,
                table::UsageRecord::UsedDate,
            ])
            .from(table::UsageRecord::Table)
            .and_where(Expr::col(table::UsageRecord::SubjectKey).eq(subject.storage_key()))
            .and_where(Expr::col(table::UsageRecord::UsedDate).gte(format_date(from)?))
            .and_where(Expr::col(table::UsageRecord::UsedDate).lte(format_date(to)?))
            .order_by(table::UsageRecord::UsedDate, Order::Desc)
            .order_by(table::UsageRecord::MealType, Order::Asc)
            .to_owned();

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        let rows = sqlx::query_as_with::<_, UsageRow, _>(&sql, values)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(UsageRecord {
                    subject_key: subject.clone(),
                    recipe_identifier: row.recipe_identifier,
                    meal_type: MealType::from_str(&row.meal_type)?,
                    used_date: parse_date(&row.used_date)?,
                })
            })
            .collect()
    }

    async fn upsert(&self, record: &UsageRecord) -> anyhow::Result<()> {
        let statement = Query::insert()
            .into_table(table::UsageRecord::Table)
            .columns([
                table::UsageRecord::SubjectKey,
                table::UsageRecord::RecipeIdentifier,
                table::UsageRecord::MealType,
                table::UsageRecord::UsedDate,
            ])
            .values([
                record.subject_key.storage_key().into(),
                record.recipe_identifier.to_owned().into(),
                record.meal_type.to_string().into(),
                format_date(record.used_date)?.into(),
            ])?
            .on_conflict(
                OnConflict::columns([
                    table::UsageRecord::SubjectKey,
                    table::UsageRecord::MealType,
                    table::UsageRecord::UsedDate,
                ])
                .update_column(table::UsageRecord::RecipeIdentifier)
                .to_owned(),
            )
            .to_owned();

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        sqlx::query_with(&sql, values).execute(&self.pool).await?;

        Ok(())
    }

    async fn purge_before(&self, cutoff: Date) -> anyhow::Result<u64> {
        let statement = Query::delete()
            .from_table(table::UsageRecord::Table)
            .and_where(Expr::col(table::UsageRecord::UsedDate).lt(format_date(cutoff)?))
            .to_owned();

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        let result = sqlx::query_with(&sql, values).execute(&self.pool).await?;

        Ok(result.rows_affected())
    }
}

#[derive(FromRow)]
struct PlanSlotRow {
    payload: Vec<u8>,
}

/// Writes one row per slot, keyed by (subject, plan date, meal type).
#[derive(Clone)]
pub struct SqlitePlanPersister {
    pool: SqlitePool,
}

impl SqlitePlanPersister {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn load(
        &self,
        subject: &SubjectKey,
        plan_date: Date,
    ) -> anyhow::Result<Vec<PlannedMeal>> {
        let statement = Query::select()
            .columns([table::MealPlanSlot::Payload])
            .from(table::MealPlanSlot::Table)
            .and_where(Expr::col(table::MealPlanSlot::SubjectKey).eq(subject.storage_key()))
            .and_where(Expr::col(table::MealPlanSlot::PlanDate).eq(format_date(plan_date)?))
            .to_owned();

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        let rows = sqlx::query_as_with::<_, PlanSlotRow, _>(&sql, values)
            .fetch_all(&self.pool)
            .await?;

        let mut meals = rows
            .iter()
            .map(|row| decode::<PlannedMeal>(&row.payload, "planned meal"))
            .collect::<anyhow::Result<Vec<_>>>()?;

        meals.sort_by_key(|meal| meal.slot.meal_type);

        Ok(meals)
    }
}

#[async_trait::async_trait]
impl PlanPersister for SqlitePlanPersister {
    async fn persist(&self, plan: &MealPlan) -> anyhow::Result<()> {
        if plan.meals.is_empty() {
            return Ok(());
        }

        let subject_key = plan.subject.storage_key();
        let plan_date = format_date(plan.plan_date)?;
        let created_at = OffsetDateTime::now_utc().unix_timestamp();

        let mut statement = Query::insert()
            .into_table(table::MealPlanSlot::Table)
            .columns([
                table::MealPlanSlot::SubjectKey,
                table::MealPlanSlot::PlanDate,
                table::MealPlanSlot::MealType,
                table::MealPlanSlot::RecipeIdentifier,
                table::MealPlanSlot::Title,
                table::MealPlanSlot::CalorieTarget,
                table::MealPlanSlot::Score,
                table::MealPlanSlot::Payload,
                table::MealPlanSlot::CreatedAt,
            ])
            .to_owned();

        for meal in &plan.meals {
            statement.values([
                subject_key.to_owned().into(),
                plan_date.to_owned().into(),
                meal.slot.meal_type.to_string().into(),
                meal.selection.identifier.to_owned().into(),
                meal.selection.candidate.title.to_owned().into(),
                i64::from(meal.slot.calorie_target).into(),
                meal.selection.score.into(),
                bitcode::encode(meal).into(),
                created_at.into(),
            ])?;
        }

        statement.on_conflict(
            OnConflict::columns([
                table::MealPlanSlot::SubjectKey,
                table::MealPlanSlot::PlanDate,
                table::MealPlanSlot::MealType,
            ])
            .update_columns([
                table::MealPlanSlot::RecipeIdentifier,
                table::MealPlanSlot::Title,
                table::MealPlanSlot::CalorieTarget,
                table::MealPlanSlot::Score,
                table::MealPlanSlot::Payload,
                table::MealPlanSlot::CreatedAt,
            ])
            .to_owned(),
        );

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        sqlx::query_with(&sql, values).execute(&self.pool).await?;

        Ok(())
    }
}

#[derive(FromRow)]
struct ProfileRow {
    payload: Vec<u8>,
}

#[derive(FromRow)]
struct SubjectRow {
    user_id: String,
    family_member_id: Option<String>,
}

#[derive(Clone)]
pub struct SqliteProfileProvider {
    pool: SqlitePool,
}

impl SqliteProfileProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, subject: &SubjectKey, profile: &HealthProfile) -> anyhow::Result<()> {
        let statement = Query::insert()
            .into_table(table::HealthProfile::Table)
            .columns([
                table::HealthProfile::SubjectKey,
                table::HealthProfile::UserId,
                table::HealthProfile::FamilyMemberId,
                table::HealthProfile::Payload,
                table::HealthProfile::UpdatedAt,
            ])
            .values([
                subject.storage_key().into(),
                subject.user_id.to_owned().into(),
                subject.family_member_id.to_owned().into(),
                bitcode::encode(profile).into(),
                OffsetDateTime::now_utc().unix_timestamp().into(),
            ])?
            .on_conflict(
                OnConflict::column(table::HealthProfile::SubjectKey)
                    .update_columns([
                        table::HealthProfile::Payload,
                        table::HealthProfile::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .to_owned();

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        sqlx::query_with(&sql, values).execute(&self.pool).await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl HealthProfileProvider for SqliteProfileProvider {
    async fn profile(&self, subject: &SubjectKey) -> anyhow::Result<HealthProfile> {
        let statement = Query::select()
            .columns([table::HealthProfile::Payload])
            .from(table::HealthProfile::Table)
            .and_where(Expr::col(table::HealthProfile::SubjectKey).eq(subject.storage_key()))
            .limit(1)
            .to_owned();

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        let row = sqlx::query_as_with::<_, ProfileRow, _>(&sql, values)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => decode(&row.payload, "health profile"),
            None => Ok(HealthProfile::default()),
        }
    }
}

#[async_trait::async_trait]
impl SubjectSource for SqliteProfileProvider {
    async fn subjects(&self) -> anyhow::Result<Vec<SubjectKey>> {
        let statement = Query::select()
            .columns([
                table::HealthProfile::UserId,
                table::HealthProfile::FamilyMemberId,
            ])
            .from(table::HealthProfile::Table)
            .order_by(table::HealthProfile::SubjectKey, Order::Asc)
            .to_owned();

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        let rows = sqlx::query_as_with::<_, SubjectRow, _>(&sql, values)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| SubjectKey {
                user_id: row.user_id,
                family_member_id: row.family_member_id,
            })
            .collect())
    }
}

#[derive(FromRow)]
struct CandidateRow {
    payload: Vec<u8>,
}

#[derive(Clone)]
pub struct SqliteCandidatePool {
    pool: SqlitePool,
}

impl SqliteCandidatePool {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, meal_type: MealType, candidate: &RecipeCandidate) -> anyhow::Result<()> {
        let statement = Query::insert()
            .into_table(table::RecipeCandidate::Table)
            .columns([
                table::RecipeCandidate::Identifier,
                table::RecipeCandidate::MealType,
                table::RecipeCandidate::Title,
                table::RecipeCandidate::Payload,
            ])
            .values([
                candidate.identifier().into(),
                meal_type.to_string().into(),
                candidate.title.to_owned().into(),
                bitcode::encode(candidate).into(),
            ])?
            .on_conflict(
                OnConflict::columns([
                    table::RecipeCandidate::MealType,
                    table::RecipeCandidate::Identifier,
                ])
                .update_columns([table::RecipeCandidate::Title, table::RecipeCandidate::Payload])
                .to_owned(),
            )
            .to_owned();

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        sqlx::query_with(&sql, values).execute(&self.pool).await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl CandidatePoolProvider for SqliteCandidatePool {
    async fn fetch(
        &self,
        meal_type: MealType,
        _preferences: &SoftPreferences,
    ) -> anyhow::Result<Vec<RecipeCandidate>> {
        let statement = Query::select()
            .columns([table::RecipeCandidate::Payload])
            .from(table::RecipeCandidate::Table)
            .and_where(Expr::col(table::RecipeCandidate::MealType).eq(meal_type.to_string()))
            .order_by(table::RecipeCandidate::Identifier, Order::Asc)
            .to_owned();

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        let rows = sqlx::query_as_with::<_, CandidateRow, _>(&sql, values)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| decode(&row.payload, "recipe candidate"))
            .collect()
    }
}
