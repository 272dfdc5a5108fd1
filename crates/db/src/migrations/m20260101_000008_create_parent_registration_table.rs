//! Create parent_registration table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ParentRegistration::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ParentRegistration::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ParentRegistration::RegistrationCode)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParentRegistration::StudentId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParentRegistration::EnrollmentRequestId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParentRegistration::GuardianEmail)
                            .string_len(320)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParentRegistration::TemporaryPasswordHash)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParentRegistration::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(ParentRegistration::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ParentRegistration::CreatedGuardianId).string_len(32))
                    .col(ColumnDef::new(ParentRegistration::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ParentRegistration::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_parent_registration_student")
                            .from(ParentRegistration::Table, ParentRegistration::StudentId)
                            .to(Student::Table, Student::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_parent_registration_enrollment_request")
                            .from(
                                ParentRegistration::Table,
                                ParentRegistration::EnrollmentRequestId,
                            )
                            .to(EnrollmentRequest::Table, EnrollmentRequest::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_parent_registration_guardian")
                            .from(
                                ParentRegistration::Table,
                                ParentRegistration::CreatedGuardianId,
                            )
                            .to(Guardian::Table, Guardian::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_parent_registration_registration_code")
                    .table(ParentRegistration::Table)
                    .col(ParentRegistration::RegistrationCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: guardian_email - at most one registration per email
        manager
            .create_index(
                Index::create()
                    .name("idx_parent_registration_guardian_email")
                    .table(ParentRegistration::Table)
                    .col(ParentRegistration::GuardianEmail)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (status, expires_at) (for the expiry sweep)
        manager
            .create_index(
                Index::create()
                    .name("idx_parent_registration_status_expires_at")
                    .table(ParentRegistration::Table)
                    .col(ParentRegistration::Status)
                    .col(ParentRegistration::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ParentRegistration::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ParentRegistration {
    Table,
    Id,
    RegistrationCode,
    StudentId,
    EnrollmentRequestId,
    GuardianEmail,
    TemporaryPasswordHash,
    Status,
    ExpiresAt,
    CreatedGuardianId,
    CompletedAt,
    CreatedAt,
}

#[derive(Iden)]
enum Student {
    Table,
    Id,
}

#[derive(Iden)]
enum EnrollmentRequest {
    Table,
    Id,
}

#[derive(Iden)]
enum Guardian {
    Table,
    Id,
}
