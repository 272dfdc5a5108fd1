//! Create course table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Course::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Course::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Course::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Course::AcademicLevelId).string_len(32))
                    .col(ColumnDef::new(Course::Price3xWeekly).decimal_len(12, 2))
                    .col(ColumnDef::new(Course::Price5xWeekly).decimal_len(12, 2))
                    .col(
                        ColumnDef::new(Course::SubscriptionDurationWeeks)
                            .integer()
                            .not_null()
                            .default(4),
                    )
                    .col(ColumnDef::new(Course::Currency).string_len(8))
                    .col(
                        ColumnDef::new(Course::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_course_academic_level")
                            .from(Course::Table, Course::AcademicLevelId)
                            .to(AcademicLevel::Table, AcademicLevel::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Course::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Course {
    Table,
    Id,
    Title,
    AcademicLevelId,
    #[iden = "price_3x_weekly"]
    Price3xWeekly,
    #[iden = "price_5x_weekly"]
    Price5xWeekly,
    SubscriptionDurationWeeks,
    Currency,
    CreatedAt,
}

#[derive(Iden)]
enum AcademicLevel {
    Table,
    Id,
}
