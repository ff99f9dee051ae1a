use crate::models::user::{AuthProvider, NewUser, User, UserRole};
use crate::repositories::user_repository::{RepositoryError, UserRepository};
use crate::services::credentials::{CredentialError, CredentialHasher};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Password too weak (minimum 8 characters)")]
    WeakPassword,
    #[error("A local account requires a password")]
    MissingPassword,
    #[error("Email already registered")]
    EmailTaken,
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub password: Option<String>,
    /// Links the account to Google instead of a local credential.
    pub google_id: Option<String>,
    pub profile_picture: Option<String>,
    pub email_verified: bool,
}

#[derive(Debug)]
pub enum PromoteOutcome {
    Promoted(User),
    NotFound,
}

pub struct UserService {
    repository: Arc<dyn UserRepository>,
    hasher: CredentialHasher,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>, hasher: CredentialHasher) -> Self {
        Self { repository, hasher }
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, UserServiceError> {
        validate_email(&request.email)?;

        let (auth_provider, password_hash) = match (&request.google_id, &request.password) {
            (Some(_), _) => (AuthProvider::Google, None),
            (None, Some(password)) => {
                validate_password(password)?;
                (AuthProvider::Local, Some(self.hasher.hash_password(password)?))
            }
            (None, None) => return Err(UserServiceError::MissingPassword),
        };

        let new_user = NewUser {
            email: request.email,
            name: request.name,
            password_hash,
            auth_provider,
            role: UserRole::User,
            email_verified: request.email_verified,
            google_id: request.google_id,
            profile_picture: request.profile_picture,
        };

        match self.repository.create_user(&new_user).await {
            Ok(user) => Ok(user),
            Err(RepositoryError::AlreadyExists) => Err(UserServiceError::EmailTaken),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, UserServiceError> {
        Ok(self.repository.find_by_email(email).await?)
    }

    pub async fn list_users(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<User>, UserServiceError> {
        Ok(self.repository.list_users(limit, offset).await?)
    }

    /// Grant the admin role and set a fresh credential. An unknown email is
    /// reported as [`PromoteOutcome::NotFound`] without touching the store.
    pub async fn promote_to_admin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<PromoteOutcome, UserServiceError> {
        validate_password(password)?;

        let Some(user) = self.repository.find_by_email(email).await? else {
            info!(email, "No user to promote");
            return Ok(PromoteOutcome::NotFound);
        };
        info!(user_id = user.id, email, role = %user.role, "Promoting user to admin");

        let password_hash = self.hasher.hash_password(password)?;

        match self.repository.promote_to_admin(email, &password_hash).await? {
            Some(updated) => Ok(PromoteOutcome::Promoted(updated)),
            None => Ok(PromoteOutcome::NotFound),
        }
    }

    pub fn verify_password(&self, password: &str, password_hash: &str) -> bool {
        self.hasher.verify_password(password, password_hash)
    }
}

pub(crate) fn validate_email(email: &str) -> Result<(), UserServiceError> {
    if !email.contains('@') || email.len() > 255 || email.is_empty() {
        return Err(UserServiceError::InvalidEmail);
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> Result<(), UserServiceError> {
    if password.len() < 8 {
        return Err(UserServiceError::WeakPassword);
    }
    Ok(())
}
