//! Business code generation with collision retry.

use academy_common::{AppError, AppResult, CodeKind, IdGenerator, Metrics, get_metrics};
use academy_db::map_db_err;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, EntityTrait, IntoActiveModel, TransactionTrait,
};
use tracing::warn;

/// Generates unique business codes, relying on the storage unique index as
/// the authority.
#[derive(Clone, Debug)]
pub struct CodeGenerator {
    id_gen: IdGenerator,
    retry_cap: u32,
}

impl CodeGenerator {
    /// Create a new code generator.
    #[must_use]
    pub const fn new(id_gen: IdGenerator, retry_cap: u32) -> Self {
        Self { id_gen, retry_cap }
    }

    /// Insert a row built around a fresh code, retrying on code collisions.
    ///
    /// Each attempt runs in its own savepoint so a collision does not abort
    /// the caller's transaction. Only a unique violation on `code_column` is
    /// retried; any other error (including other unique indexes) is returned
    /// as is. Gives up with [`AppError::ResourceExhausted`] after the cap.
    pub async fn insert_with_code<C, A, F>(
        &self,
        conn: &C,
        kind: CodeKind,
        code_column: &str,
        build: F,
    ) -> AppResult<<A::Entity as EntityTrait>::Model>
    where
        C: TransactionTrait,
        A: ActiveModelTrait + ActiveModelBehavior + Send,
        <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
        F: Fn(String) -> A + Send + Sync,
    {
        for attempt in 1..=self.retry_cap {
            let code = self.id_gen.generate_code(kind);
            let savepoint = conn.begin().await.map_err(map_db_err)?;

            match build(code.clone()).insert(&savepoint).await.map_err(map_db_err) {
                Ok(model) => {
                    savepoint.commit().await.map_err(map_db_err)?;
                    return Ok(model);
                }
                Err(e) if e.is_conflict_on(code_column) => {
                    savepoint.rollback().await.map_err(map_db_err)?;
                    Metrics::incr(&get_metrics().code_collisions);
                    warn!(%kind, %code, attempt, "Business code collision, retrying");
                }
                Err(e) => {
                    savepoint.rollback().await.map_err(map_db_err)?;
                    return Err(e);
                }
            }
        }

        Err(AppError::ResourceExhausted(format!(
            "Could not generate a unique {kind} code after {} attempts",
            self.retry_cap
        )))
    }
}
