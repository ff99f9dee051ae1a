pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod runner;
pub mod services;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

use std::sync::Arc;

use config::AdminConfig;
use db::Database;
use repositories::{
    SessionRepository, SqliteSessionRepository, SqliteUserRepository, UserRepository,
};
use services::{
    AuthService, CredentialAuditor, CredentialHasher, PasswordResetService, SchemaInspector,
    UserService,
};

/// Services wired against one open store for the duration of a task.
#[derive(Clone)]
pub struct AdminContext {
    pub db: Database,
    pub user_service: Arc<UserService>,
    pub auth_service: Arc<AuthService>,
    pub password_reset_service: Arc<PasswordResetService>,
    pub schema_inspector: Arc<SchemaInspector>,
    pub credential_auditor: Arc<CredentialAuditor>,
}

impl AdminContext {
    pub fn new(db: Database, hasher: CredentialHasher, session_ttl_hours: i64) -> Self {
        let user_repository: Arc<dyn UserRepository> =
            Arc::new(SqliteUserRepository::new(db.clone()));
        let session_repository: Arc<dyn SessionRepository> =
            Arc::new(SqliteSessionRepository::new(db.clone()));

        Self {
            user_service: Arc::new(UserService::new(user_repository.clone(), hasher.clone())),
            auth_service: Arc::new(AuthService::new(
                user_repository.clone(),
                session_repository,
                hasher.clone(),
                session_ttl_hours,
            )),
            password_reset_service: Arc::new(PasswordResetService::new(
                db.clone(),
                user_repository.clone(),
                hasher,
            )),
            schema_inspector: Arc::new(SchemaInspector::new(db.clone())),
            credential_auditor: Arc::new(CredentialAuditor::new(user_repository)),
            db,
        }
    }

    pub fn from_config(db: Database, config: &AdminConfig) -> error::Result<Self> {
        let hasher = CredentialHasher::new(&config.hashing)?;
        Ok(Self::new(db, hasher, config.session_ttl_hours))
    }
}
