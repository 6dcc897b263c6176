use sea_query::{ColumnDef, Index, Table, TableCreateStatement, TableDropStatement};

use crate::table::UsageRecord;

pub struct CreateTable;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(UsageRecord::Table)
        .col(ColumnDef::new(UsageRecord::SubjectKey).string().not_null())
        .col(
            ColumnDef::new(UsageRecord::RecipeIdentifier)
                .string()
                .not_null(),
        )
        .col(
            ColumnDef::new(UsageRecord::MealType)
                .string()
                .not_null()
                .string_len(15),
        )
        .col(
            ColumnDef::new(UsageRecord::UsedDate)
                .string()
                .not_null()
                .string_len(10),
        )
        .primary_key(
            Index::create()
                .col(UsageRecord::SubjectKey)
                .col(UsageRecord::MealType)
                .col(UsageRecord::UsedDate),
        )
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(UsageRecord::Table).to_owned()
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
