use crate::config::ConfigError;
use crate::repositories::RepositoryError;
use crate::services::{
    auth_service::AuthServiceError, credentials::CredentialError, diagnostics::DiagnosticsError,
    password_reset_service::PasswordResetError, schema_inspector::SchemaError,
    user_service::UserServiceError,
};
use thiserror::Error;

// Type alias for Result with our AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Every failure an admin task can end with. Negative outcomes such as an
/// unknown email are not errors and never reach this type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    UserService(#[from] UserServiceError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Auth(#[from] AuthServiceError),

    #[error(transparent)]
    PasswordReset(#[from] PasswordResetError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Diagnostics(#[from] DiagnosticsError),

    #[error("Input error: {0}")]
    Input(String),
}
