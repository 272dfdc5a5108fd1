//! Create academic_level table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AcademicLevel::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AcademicLevel::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AcademicLevel::Name).string_len(128).not_null())
                    .col(
                        ColumnDef::new(AcademicLevel::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AcademicLevel::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_academic_level_name")
                    .table(AcademicLevel::Table)
                    .col(AcademicLevel::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AcademicLevel::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AcademicLevel {
    Table,
    Id,
    Name,
    SortOrder,
    CreatedAt,
}
