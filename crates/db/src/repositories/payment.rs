//! Payment repository.

use crate::entities::payment::{self, PaymentStatus};
use crate::entities::Payment;
use crate::map_db_err;
use academy_common::AppResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Payment repository for database operations.
#[derive(Clone, Default)]
pub struct PaymentRepository;

impl PaymentRepository {
    /// Create a new payment repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Find a payment by ID.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<payment::Model>> {
        Payment::find_by_id(id).one(conn).await.map_err(map_db_err)
    }

    /// Find a payment by its reference code.
    pub async fn find_by_reference<C: ConnectionTrait>(
        &self,
        conn: &C,
        reference: &str,
    ) -> AppResult<Option<payment::Model>> {
        Payment::find()
            .filter(payment::Column::PaymentReference.eq(reference))
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Payments in a status (paginated, newest first).
    pub async fn find_by_status<C: ConnectionTrait>(
        &self,
        conn: &C,
        status: PaymentStatus,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<payment::Model>> {
        let mut query = Payment::find()
            .filter(payment::Column::Status.eq(status))
            .order_by_desc(payment::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(payment::Column::Id.lt(id));
        }

        query.limit(limit).all(conn).await.map_err(map_db_err)
    }

    /// Payments of a student, newest first.
    pub async fn find_by_student<C: ConnectionTrait>(
        &self,
        conn: &C,
        student_id: &str,
    ) -> AppResult<Vec<payment::Model>> {
        Payment::find()
            .filter(payment::Column::StudentId.eq(student_id))
            .order_by_desc(payment::Column::Id)
            .all(conn)
            .await
            .map_err(map_db_err)
    }

    /// Create a new payment.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: payment::ActiveModel,
    ) -> AppResult<payment::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }

    /// Settle a payment only while it is still pending. Returns `None`
    /// when another reviewer settled it first.
    pub async fn settle_pending<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
        model: payment::ActiveModel,
    ) -> AppResult<Option<payment::Model>> {
        let result = Payment::update_many()
            .set(model)
            .filter(payment::Column::Id.eq(id))
            .filter(payment::Column::Status.eq(PaymentStatus::Pending))
            .exec(conn)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find_by_id(conn, id).await
    }
}
