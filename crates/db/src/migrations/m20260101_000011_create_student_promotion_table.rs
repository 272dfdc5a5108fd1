//! Create student_promotion table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StudentPromotion::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StudentPromotion::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(StudentPromotion::PromotionCode)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StudentPromotion::StudentId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StudentPromotion::FromLevelId).string_len(32))
                    .col(
                        ColumnDef::new(StudentPromotion::ToLevelId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StudentPromotion::PromotionType)
                            .string_len(16)
                            .not_null()
                            .default("regular"),
                    )
                    .col(
                        ColumnDef::new(StudentPromotion::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(StudentPromotion::AutoUpdateEnrollments)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(StudentPromotion::PromotedBy)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StudentPromotion::ReviewedBy).string_len(32))
                    .col(ColumnDef::new(StudentPromotion::Notes).text())
                    .col(ColumnDef::new(StudentPromotion::RejectionReason).text())
                    .col(ColumnDef::new(StudentPromotion::PendingKey).string_len(32))
                    .col(
                        ColumnDef::new(StudentPromotion::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(StudentPromotion::ReviewedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(StudentPromotion::CompletedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_student_promotion_student")
                            .from(StudentPromotion::Table, StudentPromotion::StudentId)
                            .to(Student::Table, Student::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_student_promotion_to_level")
                            .from(StudentPromotion::Table, StudentPromotion::ToLevelId)
                            .to(AcademicLevel::Table, AcademicLevel::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_student_promotion_promotion_code")
                    .table(StudentPromotion::Table)
                    .col(StudentPromotion::PromotionCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: pending_key - one pending promotion per student
        manager
            .create_index(
                Index::create()
                    .name("idx_student_promotion_pending_key")
                    .table(StudentPromotion::Table)
                    .col(StudentPromotion::PendingKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StudentPromotion::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum StudentPromotion {
    Table,
    Id,
    PromotionCode,
    StudentId,
    FromLevelId,
    ToLevelId,
    PromotionType,
    Status,
    AutoUpdateEnrollments,
    PromotedBy,
    ReviewedBy,
    Notes,
    RejectionReason,
    PendingKey,
    CreatedAt,
    ReviewedAt,
    CompletedAt,
}

#[derive(Iden)]
enum Student {
    Table,
    Id,
}

#[derive(Iden)]
enum AcademicLevel {
    Table,
    Id,
}
