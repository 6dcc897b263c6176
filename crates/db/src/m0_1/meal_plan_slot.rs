use sea_query::{ColumnDef, Index, Table, TableCreateStatement, TableDropStatement};

use crate::table::MealPlanSlot;

pub struct CreateTable;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(MealPlanSlot::Table)
        .col(ColumnDef::new(MealPlanSlot::SubjectKey).string().not_null())
        .col(
            ColumnDef::new(MealPlanSlot::PlanDate)
                .string()
                .not_null()
                .string_len(10),
        )
        .col(
            ColumnDef::new(MealPlanSlot::MealType)
                .string()
                .not_null()
                .string_len(15),
        )
        .col(
            ColumnDef::new(MealPlanSlot::RecipeIdentifier)
                .string()
                .not_null(),
        )
        .col(ColumnDef::new(MealPlanSlot::Title).string().not_null())
        .col(
            ColumnDef::new(MealPlanSlot::CalorieTarget)
                .integer()
                .not_null(),
        )
        .col(ColumnDef::new(MealPlanSlot::Score).double().not_null())
        .col(ColumnDef::new(MealPlanSlot::Payload).blob().not_null())
        .col(
            ColumnDef::new(MealPlanSlot::CreatedAt)
                .big_integer()
                .not_null(),
        )
        .primary_key(
            Index::create()
                .col(MealPlanSlot::SubjectKey)
                .col(MealPlanSlot::PlanDate)
                .col(MealPlanSlot::MealType),
        )
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(MealPlanSlot::Table).to_owned()
}

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for CreateTable {
    async fn up(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = create_table().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }

    async fn down(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = drop_table().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }
}
