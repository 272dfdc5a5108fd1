//! Enrollment request repository.

use crate::entities::enrollment_request::{self, RequestStatus};
use crate::entities::EnrollmentRequest;
use crate::map_db_err;
use academy_common::AppResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Enrollment request repository for database operations.
#[derive(Clone, Default)]
pub struct EnrollmentRequestRepository;

impl EnrollmentRequestRepository {
    /// Create a new enrollment request repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Find a request by ID.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<enrollment_request::Model>> {
        EnrollmentRequest::find_by_id(id)
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Find a request by its business code.
    pub async fn find_by_code<C: ConnectionTrait>(
        &self,
        conn: &C,
        code: &str,
    ) -> AppResult<Option<enrollment_request::Model>> {
        EnrollmentRequest::find()
            .filter(enrollment_request::Column::RequestCode.eq(code))
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Find the active (non-terminal) request for a student and course.
    pub async fn find_active<C: ConnectionTrait>(
        &self,
        conn: &C,
        student_id: &str,
        course_id: &str,
    ) -> AppResult<Option<enrollment_request::Model>> {
        EnrollmentRequest::find()
            .filter(enrollment_request::Column::StudentId.eq(student_id))
            .filter(enrollment_request::Column::CourseId.eq(course_id))
            .filter(enrollment_request::Column::Status.is_in(RequestStatus::ACTIVE))
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Create a new request.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: enrollment_request::ActiveModel,
    ) -> AppResult<enrollment_request::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }

    /// Apply a transition only while the request is still in one of
    /// `expected`. Returns `None` when another writer moved it first.
    pub async fn update_if_status<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
        expected: &[RequestStatus],
        model: enrollment_request::ActiveModel,
    ) -> AppResult<Option<enrollment_request::Model>> {
        let result = EnrollmentRequest::update_many()
            .set(model)
            .filter(enrollment_request::Column::Id.eq(id))
            .filter(enrollment_request::Column::Status.is_in(expected.iter().copied()))
            .exec(conn)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find_by_id(conn, id).await
    }

    /// Requests of a student, newest first.
    pub async fn find_by_student<C: ConnectionTrait>(
        &self,
        conn: &C,
        student_id: &str,
    ) -> AppResult<Vec<enrollment_request::Model>> {
        EnrollmentRequest::find()
            .filter(enrollment_request::Column::StudentId.eq(student_id))
            .order_by_desc(enrollment_request::Column::Id)
            .all(conn)
            .await
            .map_err(map_db_err)
    }

    /// Requests in a status (paginated, newest first).
    pub async fn find_by_status<C: ConnectionTrait>(
        &self,
        conn: &C,
        status: RequestStatus,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<enrollment_request::Model>> {
        let mut query = EnrollmentRequest::find()
            .filter(enrollment_request::Column::Status.eq(status))
            .order_by_desc(enrollment_request::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(enrollment_request::Column::Id.lt(id));
        }

        query.limit(limit).all(conn).await.map_err(map_db_err)
    }

    /// Count requests in a status.
    pub async fn count_by_status<C: ConnectionTrait>(
        &self,
        conn: &C,
        status: RequestStatus,
    ) -> AppResult<u64> {
        EnrollmentRequest::find()
            .filter(enrollment_request::Column::Status.eq(status))
            .count(conn)
            .await
            .map_err(map_db_err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::enums::Frequency;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_request(id: &str, status: RequestStatus) -> enrollment_request::Model {
        enrollment_request::Model {
            id: id.to_string(),
            request_code: format!("ENR-{}", id.to_uppercase()),
            student_id: "s1".to_string(),
            course_id: "c1".to_string(),
            frequency: Frequency::ThreeWeekly,
            quoted_price: Decimal::new(8000, 2),
            message: None,
            status,
            routing_path: None,
            rejection_reason: None,
            enrollment_id: None,
            reviewed_by: None,
            reviewed_at: None,
            active_key: status
                .is_active()
                .then(|| enrollment_request::active_key("s1", "c1")),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_active_found() {
        let request = create_test_request("r1", RequestStatus::Pending);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[request]])
            .into_connection();

        let result = EnrollmentRequestRepository::new()
            .find_active(&db, "s1", "c1")
            .await
            .unwrap();

        assert_eq!(result.unwrap().status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn test_find_by_status_paginated() {
        let requests = vec![
            create_test_request("r3", RequestStatus::Pending),
            create_test_request("r2", RequestStatus::Pending),
        ];
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([requests])
            .into_connection();

        let result = EnrollmentRequestRepository::new()
            .find_by_status(&db, RequestStatus::Pending, 2, Some("r4"))
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "r3");
    }

    #[tokio::test]
    async fn test_update_if_status_skips_moved_request() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([sea_orm::MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let active = enrollment_request::ActiveModel {
            status: sea_orm::Set(RequestStatus::ParentNotified),
            ..Default::default()
        };
        let result = EnrollmentRequestRepository::new()
            .update_if_status(&db, "r1", &[RequestStatus::Pending], active)
            .await
            .unwrap();

        assert!(result.is_none());
    }
}
