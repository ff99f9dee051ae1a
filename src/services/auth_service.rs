use crate::models::{User, UserSession};
use crate::repositories::{RepositoryError, SessionRepository, UserRepository};
use crate::services::credentials::{generate_token, hash_token, CredentialHasher};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Session not found")]
    SessionNotFound,
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A successful login. `token` is the only copy of the bearer secret; the
/// store keeps its digest.
#[derive(Debug)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
    pub session: UserSession,
}

pub struct AuthService {
    user_repository: Arc<dyn UserRepository>,
    session_repository: Arc<dyn SessionRepository>,
    hasher: CredentialHasher,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        session_repository: Arc<dyn SessionRepository>,
        hasher: CredentialHasher,
        session_ttl_hours: i64,
    ) -> Self {
        Self {
            user_repository,
            session_repository,
            hasher,
            session_ttl: Duration::hours(session_ttl_hours),
        }
    }

    pub async fn authenticate(&self, request: &LoginRequest) -> Result<User, AuthServiceError> {
        // Find user by email
        let user = self
            .user_repository
            .find_by_email(&request.email)
            .await?
            .ok_or(AuthServiceError::InvalidCredentials)?;

        // Accounts without a local credential cannot log in with a password
        let Some(password_hash) = user.password_hash.as_deref() else {
            return Err(AuthServiceError::InvalidCredentials);
        };

        if !self.hasher.verify_password(&request.password, password_hash) {
            return Err(AuthServiceError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Authenticate and open a session. Bad credentials yield `Ok(None)`.
    pub async fn login(
        &self,
        request: LoginRequest,
    ) -> Result<Option<LoginResponse>, AuthServiceError> {
        let user = match self.authenticate(&request).await {
            Ok(user) => user,
            Err(AuthServiceError::InvalidCredentials) => return Ok(None),
            Err(e) => return Err(e),
        };

        let token = generate_token();
        let expires_at = (Utc::now() + self.session_ttl)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();

        let session = self
            .session_repository
            .create_session(user.id, &hash_token(&token), &expires_at)
            .await?;
        info!(user_id = user.id, session_id = session.id, "Session opened");

        Ok(Some(LoginResponse {
            user,
            token,
            session,
        }))
    }

    /// Resolve a bearer token to its user while the session is active.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, AuthServiceError> {
        let Some(session) = self
            .session_repository
            .find_active_by_token_hash(&hash_token(token))
            .await?
        else {
            return Ok(None);
        };

        Ok(self.user_repository.find_by_id(session.user_id).await?)
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthServiceError> {
        let session = self
            .session_repository
            .find_active_by_token_hash(&hash_token(token))
            .await?
            .ok_or(AuthServiceError::SessionNotFound)?;

        self.session_repository.deactivate_session(session.id).await?;
        info!(user_id = session.user_id, session_id = session.id, "Session closed");
        Ok(())
    }
}
