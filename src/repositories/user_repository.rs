use crate::db::Database;
use crate::models::user::{NewUser, User, UserRole, USER_COLUMNS};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Record not found")]
    NotFound,
    #[error("Record already exists")]
    AlreadyExists,
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &NewUser) -> RepositoryResult<User>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>>;
    async fn list_users(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> RepositoryResult<Vec<User>>;
    /// Elevate the user, replace the credential and mark the email verified
    /// in one statement. `None` when no row matches the email.
    async fn promote_to_admin(
        &self,
        email: &str,
        password_hash: &str,
    ) -> RepositoryResult<Option<User>>;
}

pub struct SqliteUserRepository {
    db: Database,
}

impl SqliteUserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create_user(&self, user: &NewUser) -> RepositoryResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users
                (email, name, password_hash, auth_provider, role, email_verified, google_id, profile_picture)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        );

        let result = self
            .db
            .timed(
                sqlx::query_as::<_, User>(&sql)
                    .bind(&user.email)
                    .bind(&user.name)
                    .bind(&user.password_hash)
                    .bind(user.auth_provider.as_str())
                    .bind(user.role.as_str())
                    .bind(user.email_verified)
                    .bind(&user.google_id)
                    .bind(&user.profile_picture)
                    .fetch_one(self.db.pool()),
            )
            .await;

        match result {
            Ok(user) => Ok(user),
            Err(e) if is_unique_violation(&e) => Err(RepositoryError::AlreadyExists),
            Err(e) => Err(RepositoryError::Database(e)),
        }
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        let user = self
            .db
            .timed(
                sqlx::query_as::<_, User>(&sql)
                    .bind(email)
                    .fetch_optional(self.db.pool()),
            )
            .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let user = self
            .db
            .timed(
                sqlx::query_as::<_, User>(&sql)
                    .bind(id)
                    .fetch_optional(self.db.pool()),
            )
            .await?;

        Ok(user)
    }

    async fn list_users(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> RepositoryResult<Vec<User>> {
        let limit = limit.unwrap_or(100);
        let offset = offset.unwrap_or(0);

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let users = self
            .db
            .timed(
                sqlx::query_as::<_, User>(&sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(self.db.pool()),
            )
            .await?;

        Ok(users)
    }

    async fn promote_to_admin(
        &self,
        email: &str,
        password_hash: &str,
    ) -> RepositoryResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
            SET role = ?,
                password_hash = ?,
                email_verified = 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE email = ?
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = self
            .db
            .timed(
                sqlx::query_as::<_, User>(&sql)
                    .bind(UserRole::Admin.as_str())
                    .bind(password_hash)
                    .bind(email)
                    .fetch_optional(self.db.pool()),
            )
            .await?;

        Ok(user)
    }
}
