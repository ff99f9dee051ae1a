use crate::models::user::{AuthProvider, UserRole};
use crate::repositories::{RepositoryResult, UserRepository};
use crate::services::credentials::hash_preview;
use serde::Serialize;
use std::sync::Arc;

/// What an operator may see about one account's credentials.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialReport {
    pub email: String,
    pub found: bool,
    pub user_id: Option<i64>,
    pub has_password: bool,
    pub hash_prefix: Option<String>,
    pub auth_provider: Option<AuthProvider>,
    pub role: Option<UserRole>,
    pub email_verified: Option<bool>,
    pub has_google_id: bool,
}

impl CredentialReport {
    fn missing(email: &str) -> Self {
        Self {
            email: email.to_string(),
            found: false,
            user_id: None,
            has_password: false,
            hash_prefix: None,
            auth_provider: None,
            role: None,
            email_verified: None,
            has_google_id: false,
        }
    }
}

pub struct CredentialAuditor {
    user_repository: Arc<dyn UserRepository>,
}

impl CredentialAuditor {
    pub fn new(user_repository: Arc<dyn UserRepository>) -> Self {
        Self { user_repository }
    }

    /// One report per requested email, in request order. Read-only.
    pub async fn audit(&self, emails: &[String]) -> RepositoryResult<Vec<CredentialReport>> {
        let mut reports = Vec::with_capacity(emails.len());

        for email in emails {
            let report = match self.user_repository.find_by_email(email).await? {
                Some(user) => CredentialReport {
                    email: user.email.clone(),
                    found: true,
                    user_id: Some(user.id),
                    has_password: user.has_password(),
                    hash_prefix: user.password_hash.as_deref().and_then(hash_preview),
                    auth_provider: Some(user.auth_provider),
                    role: Some(user.role),
                    email_verified: Some(user.email_verified),
                    has_google_id: user.google_id.is_some(),
                },
                None => CredentialReport::missing(email),
            };
            reports.push(report);
        }

        Ok(reports)
    }
}
