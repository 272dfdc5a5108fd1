//! Create guardian and guardian_student tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Guardian::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Guardian::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Guardian::AccountId).string_len(32).not_null())
                    .col(ColumnDef::new(Guardian::Phone).string_len(64))
                    .col(
                        ColumnDef::new(Guardian::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_guardian_account")
                            .from(Guardian::Table, Guardian::AccountId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_guardian_account_id")
                    .table(Guardian::Table)
                    .col(Guardian::AccountId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GuardianStudent::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GuardianStudent::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GuardianStudent::GuardianId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GuardianStudent::StudentId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GuardianStudent::RelationshipKind)
                            .string_len(16)
                            .not_null()
                            .default("guardian"),
                    )
                    .col(
                        ColumnDef::new(GuardianStudent::IsPrimaryContact)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(GuardianStudent::CanViewGrades)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(GuardianStudent::CanViewAttendance)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(GuardianStudent::IsConfirmed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(GuardianStudent::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_guardian_student_guardian")
                            .from(GuardianStudent::Table, GuardianStudent::GuardianId)
                            .to(Guardian::Table, Guardian::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_guardian_student_student")
                            .from(GuardianStudent::Table, GuardianStudent::StudentId)
                            .to(Student::Table, Student::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (guardian_id, student_id) - one link per pair
        manager
            .create_index(
                Index::create()
                    .name("idx_guardian_student_guardian_student")
                    .table(GuardianStudent::Table)
                    .col(GuardianStudent::GuardianId)
                    .col(GuardianStudent::StudentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: student_id (for routing lookups)
        manager
            .create_index(
                Index::create()
                    .name("idx_guardian_student_student_id")
                    .table(GuardianStudent::Table)
                    .col(GuardianStudent::StudentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GuardianStudent::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Guardian::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Guardian {
    Table,
    Id,
    AccountId,
    Phone,
    CreatedAt,
}

#[derive(Iden)]
enum GuardianStudent {
    Table,
    Id,
    GuardianId,
    StudentId,
    RelationshipKind,
    IsPrimaryContact,
    CanViewGrades,
    CanViewAttendance,
    IsConfirmed,
    CreatedAt,
}

#[derive(Iden)]
enum Account {
    Table,
    Id,
}

#[derive(Iden)]
enum Student {
    Table,
    Id,
}
