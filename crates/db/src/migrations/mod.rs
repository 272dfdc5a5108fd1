//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20260101_000001_create_academic_level_table;
mod m20260101_000002_create_account_table;
mod m20260101_000003_create_student_table;
mod m20260101_000004_create_guardian_tables;
mod m20260101_000005_create_course_table;
mod m20260101_000006_create_enrollment_request_table;
mod m20260101_000007_create_enrollment_table;
mod m20260101_000008_create_parent_registration_table;
mod m20260101_000009_create_payment_table;
mod m20260101_000010_create_subscription_table;
mod m20260101_000011_create_student_promotion_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_academic_level_table::Migration),
            Box::new(m20260101_000002_create_account_table::Migration),
            Box::new(m20260101_000003_create_student_table::Migration),
            Box::new(m20260101_000004_create_guardian_tables::Migration),
            Box::new(m20260101_000005_create_course_table::Migration),
            Box::new(m20260101_000006_create_enrollment_request_table::Migration),
            Box::new(m20260101_000007_create_enrollment_table::Migration),
            Box::new(m20260101_000008_create_parent_registration_table::Migration),
            Box::new(m20260101_000009_create_payment_table::Migration),
            Box::new(m20260101_000010_create_subscription_table::Migration),
            Box::new(m20260101_000011_create_student_promotion_table::Migration),
        ]
    }
}
