//! Create payment table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payment::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Payment::PaymentReference)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payment::StudentId).string_len(32).not_null())
                    .col(ColumnDef::new(Payment::GuardianId).string_len(32))
                    .col(ColumnDef::new(Payment::CourseId).string_len(32).not_null())
                    .col(ColumnDef::new(Payment::EnrollmentRequestId).string_len(32))
                    .col(ColumnDef::new(Payment::Amount).decimal_len(12, 2).not_null())
                    .col(ColumnDef::new(Payment::Currency).string_len(8).not_null())
                    .col(ColumnDef::new(Payment::ReceiptRef).string_len(1024).not_null())
                    .col(
                        ColumnDef::new(Payment::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Payment::AdminNotes).text())
                    .col(ColumnDef::new(Payment::VerifiedBy).string_len(32))
                    .col(ColumnDef::new(Payment::VerifiedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Payment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Payment::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_student")
                            .from(Payment::Table, Payment::StudentId)
                            .to(Student::Table, Student::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_guardian")
                            .from(Payment::Table, Payment::GuardianId)
                            .to(Guardian::Table, Guardian::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_course")
                            .from(Payment::Table, Payment::CourseId)
                            .to(Course::Table, Course::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_enrollment_request")
                            .from(Payment::Table, Payment::EnrollmentRequestId)
                            .to(EnrollmentRequest::Table, EnrollmentRequest::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_payment_reference")
                    .table(Payment::Table)
                    .col(Payment::PaymentReference)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: status (for the verification queue)
        manager
            .create_index(
                Index::create()
                    .name("idx_payment_status")
                    .table(Payment::Table)
                    .col(Payment::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payment::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Payment {
    Table,
    Id,
    PaymentReference,
    StudentId,
    GuardianId,
    CourseId,
    EnrollmentRequestId,
    Amount,
    Currency,
    ReceiptRef,
    Status,
    AdminNotes,
    VerifiedBy,
    VerifiedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Student {
    Table,
    Id,
}

#[derive(Iden)]
enum Guardian {
    Table,
    Id,
}

#[derive(Iden)]
enum Course {
    Table,
    Id,
}

#[derive(Iden)]
enum EnrollmentRequest {
    Table,
    Id,
}
