use sea_query::{ColumnDef, Index, Table, TableCreateStatement, TableDropStatement};

use crate::table::RecipeCandidate;

pub struct CreateTable;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(RecipeCandidate::Table)
        .col(ColumnDef::new(RecipeCandidate::Identifier).string().not_null())
        .col(
            ColumnDef::new(RecipeCandidate::MealType)
                .string()
                .not_null()
                .string_len(15),
        )
        .col(ColumnDef::new(RecipeCandidate::Title).string().not_null())
        .col(ColumnDef::new(RecipeCandidate::Payload).blob().not_null())
        .primary_key(
            Index::create()
                .col(RecipeCandidate::MealType)
                .col(RecipeCandidate::Identifier),
        )
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(RecipeCandidate::Table).to_owned()
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
