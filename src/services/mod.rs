pub mod auth_service;
pub mod credential_auditor;
pub mod credentials;
pub mod diagnostics;
pub mod password_reset_service;
pub mod schema_inspector;
pub mod user_service;

pub use auth_service::AuthService;
pub use credential_auditor::CredentialAuditor;
pub use credentials::CredentialHasher;
pub use password_reset_service::PasswordResetService;
pub use schema_inspector::SchemaInspector;
pub use user_service::UserService;
