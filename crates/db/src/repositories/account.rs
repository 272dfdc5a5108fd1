//! Account repository.

use crate::entities::{account, Account};
use crate::map_db_err;
use academy_common::AppResult;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

/// Account repository for database operations.
#[derive(Clone, Default)]
pub struct AccountRepository;

impl AccountRepository {
    /// Create a new account repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Find an account by ID.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<account::Model>> {
        Account::find_by_id(id).one(conn).await.map_err(map_db_err)
    }

    /// Find an account by (lowercased) email.
    pub async fn find_by_email<C: ConnectionTrait>(
        &self,
        conn: &C,
        email: &str,
    ) -> AppResult<Option<account::Model>> {
        Account::find()
            .filter(account::Column::Email.eq(email.to_lowercase()))
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Create a new account.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: account::ActiveModel,
    ) -> AppResult<account::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }

    /// Update an account.
    pub async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: account::ActiveModel,
    ) -> AppResult<account::Model> {
        model.update(conn).await.map_err(map_db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::account::AccountRole;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_account(id: &str, email: &str, role: AccountRole) -> account::Model {
        account::Model {
            id: id.to_string(),
            email: email.to_string(),
            name: "Test".to_string(),
            role,
            password_hash: None,
            must_change_password: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_email_found() {
        let acc = create_test_account("a1", "parent@example.com", AccountRole::Guardian);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[acc]])
            .into_connection();

        let result = AccountRepository::new()
            .find_by_email(&db, "Parent@Example.com")
            .await
            .unwrap_or_default();

        assert_eq!(result.map(|a| a.id), Some("a1".to_string()));
    }

    #[tokio::test]
    async fn test_find_by_id_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<account::Model>::new()])
            .into_connection();

        let result = AccountRepository::new().find_by_id(&db, "missing").await;
        assert!(matches!(result, Ok(None)));
    }
}
