//! Create subscription table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Subscription::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscription::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Subscription::SubscriptionCode)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Subscription::StudentId).string_len(32).not_null())
                    .col(ColumnDef::new(Subscription::CourseId).string_len(32).not_null())
                    .col(ColumnDef::new(Subscription::PaymentId).string_len(32).not_null())
                    .col(ColumnDef::new(Subscription::Frequency).string_len(16).not_null())
                    .col(ColumnDef::new(Subscription::StartDate).date().not_null())
                    .col(ColumnDef::new(Subscription::EndDate).date().not_null())
                    .col(
                        ColumnDef::new(Subscription::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Subscription::TotalSessions).integer().not_null())
                    .col(
                        ColumnDef::new(Subscription::SessionsAttended)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Subscription::SessionsRemaining)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Subscription::StatusReason).text())
                    .col(ColumnDef::new(Subscription::CancelledAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Subscription::ExpiringNotifiedAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(
                        ColumnDef::new(Subscription::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Subscription::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscription_student")
                            .from(Subscription::Table, Subscription::StudentId)
                            .to(Student::Table, Student::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscription_course")
                            .from(Subscription::Table, Subscription::CourseId)
                            .to(Course::Table, Course::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscription_payment")
                            .from(Subscription::Table, Subscription::PaymentId)
                            .to(Payment::Table, Payment::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_subscription_subscription_code")
                    .table(Subscription::Table)
                    .col(Subscription::SubscriptionCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: payment_id - one subscription per payment
        manager
            .create_index(
                Index::create()
                    .name("idx_subscription_payment_id")
                    .table(Subscription::Table)
                    .col(Subscription::PaymentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (status, end_date) (for the expiry sweep)
        manager
            .create_index(
                Index::create()
                    .name("idx_subscription_status_end_date")
                    .table(Subscription::Table)
                    .col(Subscription::Status)
                    .col(Subscription::EndDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Subscription::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Subscription {
    Table,
    Id,
    SubscriptionCode,
    StudentId,
    CourseId,
    PaymentId,
    Frequency,
    StartDate,
    EndDate,
    Status,
    TotalSessions,
    SessionsAttended,
    SessionsRemaining,
    StatusReason,
    CancelledAt,
    ExpiringNotifiedAt,
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

#[derive(Iden)]
enum Payment {
    Table,
    Id,
}
