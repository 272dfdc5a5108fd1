//! Create enrollment_request table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EnrollmentRequest::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EnrollmentRequest::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EnrollmentRequest::RequestCode)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnrollmentRequest::StudentId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnrollmentRequest::CourseId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnrollmentRequest::Frequency)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnrollmentRequest::QuotedPrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(EnrollmentRequest::Message).text())
                    .col(
                        ColumnDef::new(EnrollmentRequest::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(EnrollmentRequest::RoutingPath).string_len(24))
                    .col(ColumnDef::new(EnrollmentRequest::RejectionReason).text())
                    .col(ColumnDef::new(EnrollmentRequest::EnrollmentId).string_len(32))
                    .col(ColumnDef::new(EnrollmentRequest::ReviewedBy).string_len(32))
                    .col(ColumnDef::new(EnrollmentRequest::ReviewedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(EnrollmentRequest::ActiveKey).string_len(80))
                    .col(
                        ColumnDef::new(EnrollmentRequest::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(EnrollmentRequest::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollment_request_student")
                            .from(EnrollmentRequest::Table, EnrollmentRequest::StudentId)
                            .to(Student::Table, Student::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollment_request_course")
                            .from(EnrollmentRequest::Table, EnrollmentRequest::CourseId)
                            .to(Course::Table, Course::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_enrollment_request_request_code")
                    .table(EnrollmentRequest::Table)
                    .col(EnrollmentRequest::RequestCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: active_key - one active request per (student, course).
        // Terminal rows carry NULL, which unique indexes ignore.
        manager
            .create_index(
                Index::create()
                    .name("idx_enrollment_request_active_key")
                    .table(EnrollmentRequest::Table)
                    .col(EnrollmentRequest::ActiveKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (student_id, course_id) (for enrollment checks)
        manager
            .create_index(
                Index::create()
                    .name("idx_enrollment_request_student_course")
                    .table(EnrollmentRequest::Table)
                    .col(EnrollmentRequest::StudentId)
                    .col(EnrollmentRequest::CourseId)
                    .to_owned(),
            )
            .await?;

        // Index: status (for admin review queues)
        manager
            .create_index(
                Index::create()
                    .name("idx_enrollment_request_status")
                    .table(EnrollmentRequest::Table)
                    .col(EnrollmentRequest::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EnrollmentRequest::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum EnrollmentRequest {
    Table,
    Id,
    RequestCode,
    StudentId,
    CourseId,
    Frequency,
    QuotedPrice,
    Message,
    Status,
    RoutingPath,
    RejectionReason,
    EnrollmentId,
    ReviewedBy,
    ReviewedAt,
    ActiveKey,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Student {
    Table,
    Id,
}

#[derive(Iden)]
enum Course {
    Table,
    Id,
}
