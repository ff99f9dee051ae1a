use crate::db::Database;
use crate::models::user::{User, USER_COLUMNS};
use crate::repositories::{session_repository, RepositoryError, UserRepository};
use crate::services::credentials::{CredentialError, CredentialHasher};
use crate::services::user_service::{validate_password, UserServiceError};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum PasswordResetError {
    #[error(transparent)]
    Validation(#[from] UserServiceError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("User {0} disappeared before the credential update")]
    UserVanished(String),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug)]
pub struct PasswordReset {
    pub user: User,
    /// Whether the new plaintext validates against the hash read back from
    /// the update.
    pub hash_verified: bool,
    pub sessions_revoked: u64,
}

#[derive(Debug)]
pub enum ResetOutcome {
    Reset(PasswordReset),
    NotFound,
}

/// Replaces a user's credential and revokes every session they hold.
///
/// The credential update and the session revocation commit together: if
/// revocation fails the old credential stays in place.
pub struct PasswordResetService {
    db: Database,
    user_repository: Arc<dyn UserRepository>,
    hasher: CredentialHasher,
}

impl PasswordResetService {
    pub fn new(
        db: Database,
        user_repository: Arc<dyn UserRepository>,
        hasher: CredentialHasher,
    ) -> Self {
        Self {
            db,
            user_repository,
            hasher,
        }
    }

    pub async fn reset_password(
        &self,
        email: &str,
        new_password: &str,
    ) -> Result<ResetOutcome, PasswordResetError> {
        validate_password(new_password)?;

        // Step 1: resolve the user
        let Some(existing) = self.user_repository.find_by_email(email).await? else {
            info!(email, "No user to reset");
            return Ok(ResetOutcome::NotFound);
        };
        info!(user_id = existing.id, email, "Resetting password");

        // Step 2: hash
        let password_hash = self.hasher.hash_password(new_password)?;

        let mut tx = self.db.timed(self.db.pool().begin()).await?;

        // Step 3: persist
        let sql = format!(
            r#"
            UPDATE users
            SET password_hash = ?, updated_at = CURRENT_TIMESTAMP
            WHERE email = ?
            RETURNING {USER_COLUMNS}
            "#
        );
        let updated = self
            .db
            .timed(
                sqlx::query_as::<_, User>(&sql)
                    .bind(&password_hash)
                    .bind(email)
                    .fetch_optional(&mut *tx),
            )
            .await?;

        let Some(user) = updated else {
            tx.rollback().await?;
            return Err(PasswordResetError::UserVanished(email.to_string()));
        };

        // Step 4: self-check of the stored hash. Runs before revocation, so
        // the write lock is held for one argon2 verification.
        let hash_verified = user
            .password_hash
            .as_deref()
            .is_some_and(|stored| self.hasher.verify_password(new_password, stored));
        if !hash_verified {
            warn!(user_id = user.id, "Stored hash does not verify against the new password");
        }

        // Step 5: revoke sessions
        let revoked = self
            .db
            .timed(session_repository::deactivate_all_for_user(&mut *tx, user.id))
            .await?;

        self.db.timed(tx.commit()).await?;
        info!(user_id = user.id, sessions_revoked = revoked, "Password reset complete");

        Ok(ResetOutcome::Reset(PasswordReset {
            user,
            hash_verified,
            sessions_revoked: revoked,
        }))
    }
}
