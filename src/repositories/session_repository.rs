use crate::db::Database;
use crate::models::session::{UserSession, SESSION_COLUMNS};
use crate::repositories::user_repository::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use sqlx::{Executor, Sqlite};

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait SessionRepository: Send + Sync {
    async fn create_session(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: &str,
    ) -> RepositoryResult<UserSession>;
    /// Active, unexpired session for a token hash.
    async fn find_active_by_token_hash(
        &self,
        token_hash: &str,
    ) -> RepositoryResult<Option<UserSession>>;
    async fn deactivate_session(&self, id: i64) -> RepositoryResult<()>;
}

/// Deactivate every active session of a user.
///
/// Takes any executor so the revocation can share a transaction with the
/// credential change that triggered it. Returns the number of sessions that
/// were active before the call.
pub async fn deactivate_all_for_user<'e, E>(executor: E, user_id: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE user_sessions
        SET is_active = 0, updated_at = CURRENT_TIMESTAMP
        WHERE user_id = ? AND is_active = 1
        "#,
    )
    .bind(user_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

pub struct SqliteSessionRepository {
    db: Database,
}

impl SqliteSessionRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn create_session(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: &str,
    ) -> RepositoryResult<UserSession> {
        let sql = format!(
            r#"
            INSERT INTO user_sessions (user_id, token_hash, is_active, expires_at)
            VALUES (?, ?, 1, ?)
            RETURNING {SESSION_COLUMNS}
            "#
        );

        let session = self
            .db
            .timed(
                sqlx::query_as::<_, UserSession>(&sql)
                    .bind(user_id)
                    .bind(token_hash)
                    .bind(expires_at)
                    .fetch_one(self.db.pool()),
            )
            .await?;

        Ok(session)
    }

    async fn find_active_by_token_hash(
        &self,
        token_hash: &str,
    ) -> RepositoryResult<Option<UserSession>> {
        let sql = format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM user_sessions
            WHERE token_hash = ? AND is_active = 1 AND expires_at > CURRENT_TIMESTAMP
            "#
        );

        let session = self
            .db
            .timed(
                sqlx::query_as::<_, UserSession>(&sql)
                    .bind(token_hash)
                    .fetch_optional(self.db.pool()),
            )
            .await?;

        Ok(session)
    }

    async fn deactivate_session(&self, id: i64) -> RepositoryResult<()> {
        let result = self
            .db
            .timed(
                sqlx::query(
                    r#"
                    UPDATE user_sessions
                    SET is_active = 0, updated_at = CURRENT_TIMESTAMP
                    WHERE id = ?
                    "#,
                )
                .bind(id)
                .execute(self.db.pool()),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_pool, test_helpers};

    #[tokio::test]
    async fn test_deactivate_all_counts_only_active_sessions() {
        let db = create_test_pool().await;
        let user_id = test_helpers::insert_test_user(&db, "s@example.com", "password123", true)
            .await
            .unwrap();
        let repo = SqliteSessionRepository::new(db.clone());

        repo.create_session(user_id, "hash-1", "2999-01-01 00:00:00")
            .await
            .unwrap();
        repo.create_session(user_id, "hash-2", "2999-01-01 00:00:00")
            .await
            .unwrap();
        test_helpers::insert_test_session(&db, user_id, "hash-3", false)
            .await
            .unwrap();

        assert_eq!(
            test_helpers::count_active_sessions(&db, user_id).await.unwrap(),
            2
        );
        assert_eq!(deactivate_all_for_user(db.pool(), user_id).await.unwrap(), 2);
        assert_eq!(deactivate_all_for_user(db.pool(), user_id).await.unwrap(), 0);
        assert_eq!(
            test_helpers::count_active_sessions(&db, user_id).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_deactivate_all_rolls_back_with_transaction() {
        let db = create_test_pool().await;
        let user_id = test_helpers::insert_test_user(&db, "t@example.com", "password123", true)
            .await
            .unwrap();
        test_helpers::insert_test_session(&db, user_id, "hash-t", true)
            .await
            .unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        assert_eq!(deactivate_all_for_user(&mut *tx, user_id).await.unwrap(), 1);
        tx.rollback().await.unwrap();

        assert_eq!(
            test_helpers::count_active_sessions(&db, user_id).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_deactivate_unknown_session() {
        let db = create_test_pool().await;
        let repo = SqliteSessionRepository::new(db);

        let result = repo.deactivate_session(404).await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }
}
