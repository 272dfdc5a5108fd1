//! Student promotion repository.

use crate::entities::student_promotion::{self, PromotionStatus};
use crate::entities::StudentPromotion;
use crate::map_db_err;
use academy_common::AppResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    prelude::DateTimeWithTimeZone, sea_query::Expr,
};

/// Student promotion repository for database operations.
#[derive(Clone, Default)]
pub struct StudentPromotionRepository;

impl StudentPromotionRepository {
    /// Create a new student promotion repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Find a promotion by ID.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<student_promotion::Model>> {
        StudentPromotion::find_by_id(id)
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Find the pending promotion of a student, if any.
    pub async fn find_pending_for_student<C: ConnectionTrait>(
        &self,
        conn: &C,
        student_id: &str,
    ) -> AppResult<Option<student_promotion::Model>> {
        StudentPromotion::find()
            .filter(student_promotion::Column::StudentId.eq(student_id))
            .filter(student_promotion::Column::Status.eq(PromotionStatus::Pending))
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Promotions of a student, newest first.
    pub async fn find_by_student<C: ConnectionTrait>(
        &self,
        conn: &C,
        student_id: &str,
    ) -> AppResult<Vec<student_promotion::Model>> {
        StudentPromotion::find()
            .filter(student_promotion::Column::StudentId.eq(student_id))
            .order_by_desc(student_promotion::Column::Id)
            .all(conn)
            .await
            .map_err(map_db_err)
    }

    /// Create a new promotion.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: student_promotion::ActiveModel,
    ) -> AppResult<student_promotion::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }

    /// Update a promotion.
    pub async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: student_promotion::ActiveModel,
    ) -> AppResult<student_promotion::Model> {
        model.update(conn).await.map_err(map_db_err)
    }

    /// Close a pending promotion with a review decision.
    ///
    /// The update is conditional on the row still being `pending`, so of two
    /// concurrent reviews exactly one succeeds. Returns whether this call
    /// made the transition.
    pub async fn close_pending<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
        status: PromotionStatus,
        reviewed_by: &str,
        rejection_reason: Option<String>,
        now: DateTimeWithTimeZone,
    ) -> AppResult<bool> {
        let result = StudentPromotion::update_many()
            .col_expr(student_promotion::Column::Status, Expr::value(status))
            .col_expr(
                student_promotion::Column::ReviewedBy,
                Expr::value(Some(reviewed_by.to_string())),
            )
            .col_expr(student_promotion::Column::ReviewedAt, Expr::value(Some(now)))
            .col_expr(
                student_promotion::Column::RejectionReason,
                Expr::value(rejection_reason),
            )
            .col_expr(
                student_promotion::Column::PendingKey,
                Expr::value(Option::<String>::None),
            )
            .filter(student_promotion::Column::Id.eq(id))
            .filter(student_promotion::Column::Status.eq(PromotionStatus::Pending))
            .exec(conn)
            .await
            .map_err(map_db_err)?;

        Ok(result.rows_affected == 1)
    }
}
